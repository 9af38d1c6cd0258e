use crate::error::{AuthError, Result};
use std::fmt;
use std::str::FromStr;

/// Broker security mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mechanism {
    /// Mutual TLS, no SASL layer.
    Tls,
    /// SASL/SCRAM-SHA-512 over TLS.
    ScramSha512,
    /// SASL/OAUTHBEARER over TLS with IAM-signed tokens.
    IamOauthBearer,
}

impl Mechanism {
    /// Select a mechanism from the `security.protocol` / `sasl.mechanism` pair.
    ///
    /// `sasl_mechanism` is ignored for `SSL`.
    pub fn from_protocol(security_protocol: &str, sasl_mechanism: &str) -> Result<Self> {
        match (
            security_protocol.trim().to_ascii_uppercase().as_str(),
            sasl_mechanism.trim().to_ascii_uppercase().as_str(),
        ) {
            ("SSL", _) => Ok(Mechanism::Tls),
            ("SASL_SSL", "SCRAM-SHA-512") => Ok(Mechanism::ScramSha512),
            ("SASL_SSL", "OAUTHBEARER") => Ok(Mechanism::IamOauthBearer),
            (protocol, sasl) => Err(AuthError::UnsupportedMechanism(format!(
                "{protocol}/{sasl}"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mechanism::Tls => "TLS",
            Mechanism::ScramSha512 => "SASL_SSL/SCRAM-SHA-512",
            Mechanism::IamOauthBearer => "SASL_SSL/OAUTHBEARER",
        }
    }

    /// Value for librdkafka's `security.protocol`.
    pub fn security_protocol(&self) -> &'static str {
        match self {
            Mechanism::Tls => "SSL",
            Mechanism::ScramSha512 | Mechanism::IamOauthBearer => "SASL_SSL",
        }
    }

    /// Value for librdkafka's `sasl.mechanism`, if any.
    pub fn sasl_mechanism(&self) -> Option<&'static str> {
        match self {
            Mechanism::Tls => None,
            Mechanism::ScramSha512 => Some("SCRAM-SHA-512"),
            Mechanism::IamOauthBearer => Some("OAUTHBEARER"),
        }
    }
}

impl FromStr for Mechanism {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TLS" => Ok(Mechanism::Tls),
            "SASL_SSL/SCRAM-SHA-512" => Ok(Mechanism::ScramSha512),
            "SASL_SSL/OAUTHBEARER" => Ok(Mechanism::IamOauthBearer),
            other => Err(AuthError::UnsupportedMechanism(other.to_string())),
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
