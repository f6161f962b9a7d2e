//! # statping-common
//!
//! Shared types, error definitions, configuration models, and constants
//! used across the statping-stack workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives (logical ids, CIDR blocks,
//! ports, subnet roles) and the configuration defaulting that the stack
//! builders consume.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
