//! Credential resolution from flat settings.

use crate::error::{AuthError, Result};
use crate::keys;
use crate::mechanism::Mechanism;
use crate::SettingsMap;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Client certificate material for mutual TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// SASL/SCRAM username and password.
#[derive(Debug, Clone)]
pub struct ScramCredential {
    pub username: String,
    pub password: SecretString,
}

/// Where AWS keys come from.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Keys given directly in settings.
    Static {
        access_key_id: String,
        secret_access_key: SecretString,
        session_token: Option<SecretString>,
    },
    /// The SDK default chain (environment, profile, role assumption, instance
    /// metadata), optionally pinned to a named profile.
    DefaultChain { profile: Option<String> },
}

/// AWS identity used to sign IAM tokens and to call AWS APIs.
#[derive(Debug, Clone)]
pub struct IamIdentity {
    pub region: String,
    pub source: KeySource,
}

/// The single credential active for a configured mechanism.
#[derive(Debug, Clone)]
pub enum Credential {
    Tls(TlsMaterial),
    Scram(ScramCredential),
    Iam(IamIdentity),
}

impl Credential {
    pub fn mechanism(&self) -> Mechanism {
        match self {
            Credential::Tls(_) => Mechanism::Tls,
            Credential::Scram(_) => Mechanism::ScramSha512,
            Credential::Iam(_) => Mechanism::IamOauthBearer,
        }
    }
}

/// Build the credential for `mechanism` from `settings`.
///
/// Fails on the first required setting that is absent or empty, naming it.
/// The only I/O performed is checking that TLS material files exist.
pub fn resolve(mechanism: Mechanism, settings: &SettingsMap) -> Result<Credential> {
    debug!(mechanism = %mechanism, "Resolving credentials");

    match mechanism {
        Mechanism::Tls => Ok(Credential::Tls(TlsMaterial {
            ca: existing_file(settings, keys::SSL_CA_LOCATION)?,
            cert: existing_file(settings, keys::SSL_CERT_LOCATION)?,
            key: existing_file(settings, keys::SSL_KEY_LOCATION)?,
        })),
        Mechanism::ScramSha512 => Ok(Credential::Scram(ScramCredential {
            username: required(settings, keys::KAFKA_SASL_USERNAME)?.to_string(),
            password: SecretString::new(
                required(settings, keys::KAFKA_SASL_PASSWORD)?.to_string(),
            ),
        })),
        Mechanism::IamOauthBearer => Ok(Credential::Iam(resolve_aws_identity(settings)?)),
    }
}

/// Resolve the AWS identity on its own, independent of the broker mechanism.
///
/// Static keys are used when `AWS_ACCESS_KEY_ID` is set, in which case the
/// secret key becomes mandatory. Otherwise the SDK default chain is used.
pub fn resolve_aws_identity(settings: &SettingsMap) -> Result<IamIdentity> {
    let region = required(settings, keys::AWS_REGION)?.to_string();

    let source = match optional(settings, keys::AWS_ACCESS_KEY_ID) {
        Some(access_key_id) => KeySource::Static {
            access_key_id: access_key_id.to_string(),
            secret_access_key: SecretString::new(
                required(settings, keys::AWS_SECRET_ACCESS_KEY)?.to_string(),
            ),
            session_token: optional(settings, keys::AWS_SESSION_TOKEN)
                .map(|t| SecretString::new(t.to_string())),
        },
        None => KeySource::DefaultChain {
            profile: optional(settings, keys::AWS_PROFILE).map(str::to_string),
        },
    };

    Ok(IamIdentity { region, source })
}

fn optional<'a>(settings: &'a SettingsMap, key: &str) -> Option<&'a str> {
    settings
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(settings: &'a SettingsMap, key: &str) -> Result<&'a str> {
    optional(settings, key).ok_or_else(|| AuthError::MissingCredentialField(key.to_string()))
}

fn existing_file(settings: &SettingsMap, key: &str) -> Result<PathBuf> {
    let path = Path::new(required(settings, key)?);
    if !path.is_file() {
        return Err(AuthError::TlsMaterialNotFound {
            field: key.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}
