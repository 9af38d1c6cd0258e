use msk_admin_auth::AuthError;
use msk_admin_profiles::ProfileError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdminError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Credential(#[from] AuthError),

    #[error("Invalid topic spec: {0}")]
    InvalidTopicSpec(String),

    #[error("Topic '{0}' already exists")]
    TopicAlreadyExists(String),

    #[error("Topic '{0}' not found")]
    TopicNotFound(String),

    #[error("Topic '{topic}' was not ready after {waited_ms} ms")]
    PropagationTimeout { topic: String, waited_ms: u64 },

    #[error("Deleting topic '{0}' requires explicit confirmation")]
    ConfirmationRequired(String),

    #[error("Topic '{topic}' has overrides the broker did not return a value for: {keys}")]
    UnreadableOverride { topic: String, keys: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("Kafka error: {0}")]
    Kafka(String),
}

impl AdminError {
    /// Stable name of the failure kind, for callers that branch on it.
    pub fn kind(&self) -> &'static str {
        match self {
            AdminError::Profile(e) => e.kind(),
            AdminError::Credential(e) => e.kind(),
            AdminError::InvalidTopicSpec(_) => "InvalidTopicSpec",
            AdminError::TopicAlreadyExists(_) => "TopicAlreadyExists",
            AdminError::TopicNotFound(_) => "TopicNotFound",
            AdminError::PropagationTimeout { .. } => "PropagationTimeout",
            AdminError::ConfirmationRequired(_) => "ConfirmationRequired",
            AdminError::UnreadableOverride { .. } => "UnreadableOverride",
            AdminError::PermissionDenied(_) => "PermissionDenied",
            AdminError::BrokerUnavailable(_) => "BrokerUnavailable",
            AdminError::Kafka(_) => "KafkaError",
        }
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_delegates_to_source() {
        let err: AdminError = ProfileError::UnknownProfile {
            name: "fast".to_string(),
            available: "general_throughput".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "UnknownProfile");
        assert!(err.to_string().contains("fast"));

        let err: AdminError = AuthError::MissingCredentialField("AWS_REGION".to_string()).into();
        assert_eq!(err.kind(), "MissingCredentialField");
    }

    #[test]
    fn test_timeout_message() {
        let err = AdminError::PropagationTimeout {
            topic: "orders".to_string(),
            waited_ms: 30000,
        };
        assert_eq!(err.to_string(), "Topic 'orders' was not ready after 30000 ms");
    }
}
