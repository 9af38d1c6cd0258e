//! Turning an [`IamIdentity`] into usable AWS keys and SDK configuration.

use crate::credential::{IamIdentity, KeySource};
use crate::error::{AuthError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::info;

/// Resolved AWS keys, ready for signing without further I/O.
#[derive(Clone)]
pub struct AwsKeys {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expires_at: Option<DateTime<Utc>>,
}

impl AwsKeys {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: session_token.map(SecretString::new),
            expires_at: None,
        }
    }

    /// Mark the keys as temporary, valid until `expires_at`.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Temporary keys past their expiry can no longer sign anything useful.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for AwsKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Load SDK configuration bound to the identity's region and key source.
pub async fn load_sdk_config(identity: &IamIdentity) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(identity.region.clone()));

    match &identity.source {
        KeySource::Static {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.expose_secret().clone(),
                session_token.as_ref().map(|t| t.expose_secret().clone()),
                None,
                "msk-admin-settings",
            ));
        }
        KeySource::DefaultChain {
            profile: Some(profile),
        } => {
            loader = loader.profile_name(profile);
        }
        KeySource::DefaultChain { profile: None } => {}
    }

    loader.load().await
}

/// Resolve the identity into static keys.
///
/// Static settings are returned as-is. The default chain is walked once here,
/// so later token signing never has to touch the network.
pub async fn resolve_keys(identity: &IamIdentity) -> Result<AwsKeys> {
    if let KeySource::Static {
        access_key_id,
        secret_access_key,
        session_token,
    } = &identity.source
    {
        return Ok(AwsKeys {
            access_key_id: access_key_id.clone(),
            secret_access_key: secret_access_key.clone(),
            session_token: session_token.clone(),
            expires_at: None,
        });
    }

    let config = load_sdk_config(identity).await;
    let provider = config.credentials_provider().ok_or_else(|| {
        AuthError::CredentialUnavailable("no AWS credentials provider configured".to_string())
    })?;

    let credentials = provider
        .provide_credentials()
        .await
        .map_err(|e| AuthError::CredentialUnavailable(e.to_string()))?;

    let mut keys = AwsKeys::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        credentials.session_token().map(str::to_string),
    );
    if let Some(expiry) = credentials.expiry() {
        keys = keys.with_expiry(DateTime::<Utc>::from(expiry));
    }

    info!(
        region = %identity.region,
        temporary = keys.session_token.is_some(),
        "Resolved AWS credentials from default chain"
    );
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_debug_redacts_secrets() {
        let keys = AwsKeys::new("AKIDEXAMPLE", "very-secret", Some("tok-123".to_string()));
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("AKIDEXAMPLE"));
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("tok-123"));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let keys = AwsKeys::new("AKID", "secret", None);
        assert!(!keys.is_expired_at(now));

        let keys = keys.with_expiry(now - Duration::seconds(1));
        assert!(keys.is_expired_at(now));
    }

    #[tokio::test]
    async fn test_static_keys_resolve_without_sdk() {
        let identity = IamIdentity {
            region: "us-east-1".to_string(),
            source: KeySource::Static {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: SecretString::new("secret".to_string()),
                session_token: None,
            },
        };
        let keys = resolve_keys(&identity).await.unwrap();
        assert_eq!(keys.access_key_id(), "AKIDEXAMPLE");
        assert_eq!(keys.secret_access_key(), "secret");
        assert_eq!(keys.session_token(), None);
    }
}
