use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Profile '{name}' not found. Available profiles: {available}")]
    UnknownProfile { name: String, available: String },

    #[error("Invalid topic configuration: {0}")]
    InvalidTopicConfig(String),
}

impl ProfileError {
    /// Stable name of the failure kind, for callers that branch on it.
    pub fn kind(&self) -> &'static str {
        match self {
            ProfileError::UnknownProfile { .. } => "UnknownProfile",
            ProfileError::InvalidTopicConfig(_) => "InvalidTopicConfig",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProfileError>;
