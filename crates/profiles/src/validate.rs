//! Local checks on a resolved topic configuration.

use crate::error::{ProfileError, Result};
use crate::ConfigMap;
use tracing::warn;

/// Compression codecs accepted for `compression.type`.
pub const VALID_COMPRESSION_TYPES: &[&str] = &["none", "gzip", "snappy", "lz4", "zstd", "producer"];

/// Reject configurations the broker would accept but that are almost
/// certainly mistakes, before anything leaves the process.
pub fn validate_config(config: &ConfigMap, replication_factor: u32) -> Result<()> {
    if let Some(raw) = config.get("min.insync.replicas") {
        let min_isr: u32 = raw.trim().parse().map_err(|_| {
            ProfileError::InvalidTopicConfig(format!(
                "min.insync.replicas must be an integer, got '{raw}'"
            ))
        })?;
        if min_isr >= replication_factor {
            return Err(ProfileError::InvalidTopicConfig(format!(
                "min.insync.replicas ({min_isr}) must be less than replication factor ({replication_factor})"
            )));
        }
    }

    if let Some(compression) = config.get("compression.type") {
        if !VALID_COMPRESSION_TYPES.contains(&compression.as_str()) {
            return Err(ProfileError::InvalidTopicConfig(format!(
                "Invalid compression.type '{compression}'. Valid options: {}",
                VALID_COMPRESSION_TYPES.join(", ")
            )));
        }
    }

    if config
        .get("unclean.leader.election.enable")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        warn!("unclean.leader.election.enable=true can cause data loss");
    }

    Ok(())
}
