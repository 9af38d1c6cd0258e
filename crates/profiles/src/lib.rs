//! Topic configuration profiles for msk-admin.
//!
//! This crate owns the declarative side of topic configuration:
//!
//! - [`ProfileCatalog`]: the fixed set of named profiles (`general_throughput`,
//!   `low_latency`, `compaction_log`, `long_retention`), built once at startup
//!   and shared by reference.
//! - [`merge`]: explicit overrides layered over a profile's defaults.
//! - [`diff`]: the minimal change-set between a desired and an observed
//!   configuration.
//! - [`validate_config`]: local sanity checks run before any broker call.
//!
//! Precedence is always explicit override > profile default > broker default.

pub mod catalog;
pub mod diff;
pub mod error;
pub mod validate;

use std::collections::BTreeMap;

/// Topic configuration as key/value strings, the way the broker reports it.
pub type ConfigMap = BTreeMap<String, String>;

pub use catalog::{merge, PerformanceNotes, ProfileCatalog, ProfileDefinition, DEFAULT_PROFILE};
pub use diff::{diff, ConfigDelta};
pub use error::{ProfileError, Result};
pub use validate::{validate_config, VALID_COMPRESSION_TYPES};
