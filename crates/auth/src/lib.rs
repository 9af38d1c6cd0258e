//! Authentication for msk-admin's broker and registry connections.
//!
//! Three mechanisms are supported, selected from settings:
//!
//! | Mechanism | Security protocol | Credential |
//! |---|---|---|
//! | `TLS` | `SSL` | [`TlsMaterial`] (CA, client cert, client key paths) |
//! | `SASL_SSL/SCRAM-SHA-512` | `SASL_SSL` | [`ScramCredential`] |
//! | `SASL_SSL/OAUTHBEARER` | `SASL_SSL` | [`IamIdentity`], exchanged for signed tokens |
//!
//! [`resolve`] turns a flat settings map into exactly one [`Credential`] and
//! fails naming the first missing setting. For IAM, [`resolve_keys`] turns the
//! identity into static keys once, and [`IamTokenProvider`] signs and caches
//! the short-lived bearer tokens librdkafka asks for on its own threads.

pub mod credential;
pub mod error;
pub mod identity;
pub mod mechanism;
pub mod sigv4;
pub mod token;

use std::collections::BTreeMap;

/// Flat named settings, keyed by environment variable name.
pub type SettingsMap = BTreeMap<String, String>;

/// Setting names understood by the resolver.
pub mod keys {
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const AWS_PROFILE: &str = "AWS_PROFILE";
    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";
    pub const KAFKA_SASL_USERNAME: &str = "KAFKA_SASL_USERNAME";
    pub const KAFKA_SASL_PASSWORD: &str = "KAFKA_SASL_PASSWORD";
    pub const SSL_CA_LOCATION: &str = "SSL_CA_LOCATION";
    pub const SSL_CERT_LOCATION: &str = "SSL_CERT_LOCATION";
    pub const SSL_KEY_LOCATION: &str = "SSL_KEY_LOCATION";
}

pub use credential::{
    resolve, resolve_aws_identity, Credential, IamIdentity, KeySource, ScramCredential,
    TlsMaterial,
};
pub use error::{AuthError, Result};
pub use identity::{load_sdk_config, resolve_keys, AwsKeys};
pub use mechanism::Mechanism;
pub use token::{
    generate_token, token_state, Clock, IamToken, IamTokenProvider, SystemClock, TokenState,
    DEFAULT_REFRESH_MARGIN_SECS, TOKEN_VALIDITY_SECS,
};
