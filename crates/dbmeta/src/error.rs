//! Error types for metadata retrieval and DDL synthesis.

use thiserror::Error;

/// Main error type for metadata operations.
///
/// Read-only introspection calls never surface [`MetaError::Connectivity`] to
/// the caller - those are caught at the reader boundary, logged and degraded
/// to an empty result. Mutating operations (DROP etc.) surface errors so the
/// caller can report them.
#[derive(Error, Debug)]
pub enum MetaError {
    /// A catalog introspection call against the database failed.
    #[error("catalog call failed: {0}")]
    Connectivity(String),

    /// A mutating (DDL) operation failed.
    #[error("{operation} failed for {object}: {message}")]
    Structural {
        operation: String,
        object: String,
        message: String,
    },

    /// Invalid user-supplied configuration (bad regex, malformed mapping).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No dialect-specific reader exists for a capability.
    ///
    /// Callers normally never see this - the facade silently falls back to
    /// the generic reader.
    #[error("dialect '{dialect}' has no {capability} support")]
    Unsupported {
        dialect: String,
        capability: String,
    },

    /// The facade was closed; no further metadata calls are possible.
    #[error("metadata facade is closed")]
    Closed,

    /// A long-running scan was cancelled via its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// YAML deserialization error when loading settings.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error (settings file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaError {
    /// Create a Connectivity error from any displayable cause.
    pub fn connectivity(message: impl Into<String>) -> Self {
        MetaError::Connectivity(message.into())
    }

    /// Create a Structural error with operation context.
    pub fn structural(
        operation: impl Into<String>,
        object: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        MetaError::Structural {
            operation: operation.into(),
            object: object.into(),
            message: message.into(),
        }
    }

    /// Create a Configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MetaError::Configuration(message.into())
    }
}

/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, MetaError>;
