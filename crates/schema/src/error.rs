//! Schema registry errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid schema syntax: {0}")]
    InvalidSchemaSyntax(String),

    #[error("Schema '{name}' is incompatible: {reason}")]
    IncompatibleSchema { name: String, reason: String },

    #[error("Schema '{name}'{} not found", version.map(|v| format!(" version {v}")).unwrap_or_default())]
    SchemaNotFound { name: String, version: Option<u32> },

    #[error("Invalid compatibility mode '{0}'. Valid options: BACKWARD, FORWARD, FULL, NONE")]
    InvalidCompatibilityMode(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Schema registry unavailable: {0}")]
    RegistryUnavailable(String),
}

impl RegistryError {
    /// Stable name of the failure kind, for callers that branch on it.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::InvalidSchemaSyntax(_) => "InvalidSchemaSyntax",
            RegistryError::IncompatibleSchema { .. } => "IncompatibleSchema",
            RegistryError::SchemaNotFound { .. } => "SchemaNotFound",
            RegistryError::InvalidCompatibilityMode(_) => "InvalidCompatibilityMode",
            RegistryError::PermissionDenied(_) => "PermissionDenied",
            RegistryError::RegistryUnavailable(_) => "RegistryUnavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
