//! Process settings, read from flags or the environment.

use clap::{Args, ValueEnum};
use msk_admin_auth::{AuthError, Mechanism, SettingsMap};
use std::collections::BTreeMap;
use std::path::PathBuf;

const MASK: &str = "***MASKED***";

/// Settings whose values never leave the process unmasked.
pub const SENSITIVE_SETTINGS: [&str; 4] = [
    "KAFKA_SASL_PASSWORD",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "SSL_KEY_LOCATION",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Clone)]
pub struct Settings {
    /// AWS region of the cluster and the schema registry
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1", global = true)]
    pub aws_region: String,

    /// MSK cluster ARN, used to discover bootstrap brokers
    #[arg(long, env = "MSK_CLUSTER_ARN", global = true)]
    pub msk_cluster_arn: Option<String>,

    /// Bootstrap servers (host:port,...); takes precedence over discovery
    #[arg(long = "bootstrap", env = "KAFKA_BOOTSTRAP", global = true)]
    pub kafka_bootstrap: Option<String>,

    /// Security protocol: SSL or SASL_SSL
    #[arg(long, env = "KAFKA_SECURITY_PROTOCOL", default_value = "SASL_SSL", global = true)]
    pub security_protocol: String,

    /// SASL mechanism: SCRAM-SHA-512 or OAUTHBEARER (IAM)
    #[arg(long, env = "KAFKA_SASL_MECHANISM", default_value = "OAUTHBEARER", global = true)]
    pub sasl_mechanism: String,

    /// SASL/SCRAM username
    #[arg(long, env = "KAFKA_SASL_USERNAME", global = true)]
    pub sasl_username: Option<String>,

    /// SASL/SCRAM password
    #[arg(long, env = "KAFKA_SASL_PASSWORD", hide_env_values = true, global = true)]
    pub sasl_password: Option<String>,

    /// CA bundle for broker certificates
    #[arg(long, env = "SSL_CA_LOCATION", global = true)]
    pub ssl_ca_location: Option<PathBuf>,

    /// Client certificate for mutual TLS
    #[arg(long, env = "SSL_CERT_LOCATION", global = true)]
    pub ssl_cert_location: Option<PathBuf>,

    /// Client private key for mutual TLS
    #[arg(long, env = "SSL_KEY_LOCATION", global = true)]
    pub ssl_key_location: Option<PathBuf>,

    /// Named AWS profile for the default credential chain
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub aws_profile: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true, global = true)]
    pub aws_access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true, global = true)]
    pub aws_secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true, global = true)]
    pub aws_session_token: Option<String>,

    /// Glue Schema Registry name
    #[arg(long, env = "GLUE_REGISTRY_NAME", default_value = "weatherxflights", global = true)]
    pub glue_registry_name: String,

    /// Partition count for `topics create` when -p is not given
    #[arg(long, env = "DEFAULT_PARTITIONS", default_value_t = 6, global = true)]
    pub default_partitions: u32,

    /// Replication factor for `topics create` when -r is not given
    #[arg(long, env = "DEFAULT_REPLICATION_FACTOR", default_value_t = 3, global = true)]
    pub default_replication_factor: u32,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

impl Settings {
    /// The broker mechanism selected by protocol and SASL mechanism.
    pub fn mechanism(&self) -> Result<Mechanism, AuthError> {
        Mechanism::from_protocol(&self.security_protocol, &self.sasl_mechanism)
    }

    /// Bootstrap servers when given explicitly and non-blank.
    pub fn bootstrap(&self) -> Option<&str> {
        non_blank(self.kafka_bootstrap.as_deref())
    }

    pub fn cluster_arn(&self) -> Option<&str> {
        non_blank(self.msk_cluster_arn.as_deref())
    }

    fn entries(&self) -> Vec<(&'static str, Option<String>)> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());
        vec![
            ("AWS_REGION", Some(self.aws_region.clone())),
            ("MSK_CLUSTER_ARN", self.msk_cluster_arn.clone()),
            ("KAFKA_BOOTSTRAP", self.kafka_bootstrap.clone()),
            ("KAFKA_SECURITY_PROTOCOL", Some(self.security_protocol.clone())),
            ("KAFKA_SASL_MECHANISM", Some(self.sasl_mechanism.clone())),
            ("KAFKA_SASL_USERNAME", self.sasl_username.clone()),
            ("KAFKA_SASL_PASSWORD", self.sasl_password.clone()),
            ("SSL_CA_LOCATION", path(&self.ssl_ca_location)),
            ("SSL_CERT_LOCATION", path(&self.ssl_cert_location)),
            ("SSL_KEY_LOCATION", path(&self.ssl_key_location)),
            ("AWS_PROFILE", self.aws_profile.clone()),
            ("AWS_ACCESS_KEY_ID", self.aws_access_key_id.clone()),
            ("AWS_SECRET_ACCESS_KEY", self.aws_secret_access_key.clone()),
            ("AWS_SESSION_TOKEN", self.aws_session_token.clone()),
            ("GLUE_REGISTRY_NAME", Some(self.glue_registry_name.clone())),
            ("DEFAULT_PARTITIONS", Some(self.default_partitions.to_string())),
            (
                "DEFAULT_REPLICATION_FACTOR",
                Some(self.default_replication_factor.to_string()),
            ),
            ("LOG_LEVEL", Some(self.log_level.clone())),
            (
                "LOG_FORMAT",
                Some(
                    match self.log_format {
                        LogFormat::Text => "text",
                        LogFormat::Json => "json",
                    }
                    .to_string(),
                ),
            ),
        ]
    }

    /// Flat named settings for credential resolution, keyed by env var name.
    /// Unset and blank values are left out.
    pub fn to_settings_map(&self) -> SettingsMap {
        self.entries()
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?;
                (!value.trim().is_empty()).then(|| (key.to_string(), value))
            })
            .collect()
    }

    /// Every setting for display, secrets replaced by a mask.
    pub fn masked(&self) -> BTreeMap<&'static str, Option<String>> {
        self.entries()
            .into_iter()
            .map(|(key, value)| {
                if SENSITIVE_SETTINGS.contains(&key) {
                    (key, value.map(|_| MASK.to_string()))
                } else {
                    (key, value)
                }
            })
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
