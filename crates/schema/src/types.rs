//! Schema registry data types.

use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a new schema version must relate to the latest existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompatibilityMode {
    /// Consumers on the new schema can read data written with the old one.
    #[default]
    Backward,
    /// Consumers on the old schema can read data written with the new one.
    Forward,
    /// Both directions.
    Full,
    /// No checking.
    None,
}

impl CompatibilityMode {
    pub const ALL: [CompatibilityMode; 4] = [
        CompatibilityMode::Backward,
        CompatibilityMode::Forward,
        CompatibilityMode::Full,
        CompatibilityMode::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompatibilityMode::Backward => "BACKWARD",
            CompatibilityMode::Forward => "FORWARD",
            CompatibilityMode::Full => "FULL",
            CompatibilityMode::None => "NONE",
        }
    }

    pub fn is_backward(&self) -> bool {
        matches!(self, CompatibilityMode::Backward | CompatibilityMode::Full)
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, CompatibilityMode::Forward | CompatibilityMode::Full)
    }
}

impl FromStr for CompatibilityMode {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BACKWARD" => Ok(CompatibilityMode::Backward),
            "FORWARD" => Ok(CompatibilityMode::Forward),
            "FULL" => Ok(CompatibilityMode::Full),
            "NONE" => Ok(CompatibilityMode::None),
            _ => Err(RegistryError::InvalidCompatibilityMode(s.to_string())),
        }
    }
}

impl fmt::Display for CompatibilityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of a schema, body included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub version: u32,
    pub compatibility: CompatibilityMode,
    #[serde(rename = "schema_definition")]
    pub body: String,
}

/// Registry metadata for one schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaVersion {
    pub schema_name: String,
    /// Starts at 1 and increases by one per registered version.
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A schema as listed in its registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Outcome of a compatibility dry-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityVerdict {
    pub compatible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,
}

impl CompatibilityVerdict {
    pub fn compatible() -> Self {
        Self {
            compatible: true,
            messages: Vec::new(),
        }
    }

    pub fn incompatible(messages: Vec<String>) -> Self {
        Self {
            compatible: false,
            messages,
        }
    }

    /// All messages joined, for error reporting.
    pub fn reason(&self) -> String {
        self.messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_case_insensitive() {
        assert_eq!("backward".parse::<CompatibilityMode>().unwrap(), CompatibilityMode::Backward);
        assert_eq!(" Full ".parse::<CompatibilityMode>().unwrap(), CompatibilityMode::Full);

        let err = "TRANSITIVE".parse::<CompatibilityMode>().unwrap_err();
        assert_eq!(err.kind(), "InvalidCompatibilityMode");
    }

    #[test]
    fn test_mode_directions() {
        assert!(CompatibilityMode::Full.is_backward() && CompatibilityMode::Full.is_forward());
        assert!(!CompatibilityMode::None.is_backward() && !CompatibilityMode::None.is_forward());
        assert!(CompatibilityMode::Forward.is_forward() && !CompatibilityMode::Forward.is_backward());
    }

    #[test]
    fn test_mode_display_round_trip() {
        for mode in CompatibilityMode::ALL {
            assert_eq!(mode.to_string().parse::<CompatibilityMode>().unwrap(), mode);
        }
    }
}
