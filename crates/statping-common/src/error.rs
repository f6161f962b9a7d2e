//! Unified error type for the statping-stack workspace.
//!
//! Every failure surfaces while the stack is being declared: bad
//! configuration, dangling references between resources, or template
//! serialization. Nothing here covers provisioning-time failures, which
//! belong to the engine that applies the template.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A mandatory configuration field was absent or empty.
    #[error("missing required configuration field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A referenced resource was not declared.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Two resources were declared with the same logical id.
    #[error("duplicate logical id: {id}")]
    DuplicateId {
        /// The conflicting logical id.
        id: String,
    },

    /// The resource graph contains a dependency cycle.
    #[error("cyclic dependency detected involving {id}")]
    Cycle {
        /// A logical id that participates in the cycle.
        id: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackError>;
