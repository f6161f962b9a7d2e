//! # statping-stack
//!
//! Declares the Statping deployment as a resource graph and renders it
//! into a CloudFormation template.
//!
//! Handles:
//! - **Template**: the CloudFormation document model and intrinsic functions.
//! - **Stack**: the scope that owns the template and hands out logical ids.
//! - **Graph**: reference validation and dependency ordering.
//! - **Builders**: network, security groups, database, ECS cluster, DNS and
//!   certificate, load-balanced Fargate service.
//! - **Statping**: the assembly that wires all builders together.
//!
//! # Example
//!
//! ```rust,no_run
//! use statping_common::config::StackConfiguration;
//! use statping_stack::statping::StatpingStack;
//!
//! let stack = StatpingStack::new(
//!     "CdkStatpingStack",
//!     StackConfiguration::new("Z1VKI2XXXXXXX", "example.com"),
//! )?;
//! let json = stack.synth()?.to_json_pretty()?;
//! # Ok::<(), statping_common::error::StackError>(())
//! ```

pub mod cluster;
pub mod database;
pub mod dns;
pub mod graph;
pub mod network;
pub mod security_group;
pub mod service;
pub mod stack;
pub mod statping;
pub mod template;
