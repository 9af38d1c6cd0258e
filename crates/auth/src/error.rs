use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credential field: {0} is required for the selected mechanism")]
    MissingCredentialField(String),

    #[error("TLS material {field} not found at {}", path.display())]
    TlsMaterialNotFound { field: String, path: PathBuf },

    #[error("Unsupported security mechanism: {0}")]
    UnsupportedMechanism(String),

    #[error("AWS credentials unavailable: {0}")]
    CredentialUnavailable(String),
}

impl AuthError {
    /// Stable name of the failure kind, for callers that branch on it.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentialField(_) | AuthError::TlsMaterialNotFound { .. } => {
                "MissingCredentialField"
            }
            AuthError::UnsupportedMechanism(_) => "UnsupportedMechanism",
            AuthError::CredentialUnavailable(_) => "CredentialUnavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
