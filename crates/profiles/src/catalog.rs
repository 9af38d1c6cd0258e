//! The fixed catalog of topic configuration profiles.

use crate::error::{ProfileError, Result};
use crate::ConfigMap;
use serde::Serialize;

/// Profile applied by the CLI when none is given.
pub const DEFAULT_PROFILE: &str = "general_throughput";

/// Human-oriented tradeoff notes for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerformanceNotes {
    pub throughput: String,
    pub latency: String,
    pub durability: String,
    pub storage: String,
    pub use_case: String,
}

/// A named, immutable bundle of topic configuration defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileDefinition {
    pub name: String,
    pub description: String,
    /// Configuration entries in declaration order.
    pub settings: Vec<(String, String)>,
    pub performance: PerformanceNotes,
}

impl ProfileDefinition {
    /// Look up a single setting of this profile.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The profile's settings as a configuration map.
    pub fn to_config_map(&self) -> ConfigMap {
        self.settings.iter().cloned().collect()
    }
}

/// Read-only registry of the built-in profiles.
///
/// Construct it once with [`ProfileCatalog::builtin`] and pass it by reference;
/// nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: Vec<ProfileDefinition>,
}

impl ProfileCatalog {
    /// The four built-in profiles.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                general_throughput(),
                low_latency(),
                compaction_log(),
                long_retention(),
            ],
        }
    }

    /// Fetch a profile by name.
    pub fn get(&self, name: &str) -> Result<&ProfileDefinition> {
        self.profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ProfileError::UnknownProfile {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// All profiles in catalog order.
    pub fn list(&self) -> &[ProfileDefinition] {
        &self.profiles
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Layer explicit overrides over a profile's defaults.
///
/// Keys only in the profile pass through, keys only in `overrides` are added,
/// and on conflict the override wins. No other keys ever appear.
pub fn merge(profile: &ProfileDefinition, overrides: &ConfigMap) -> ConfigMap {
    let mut merged = profile.to_config_map();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

fn profile(
    name: &str,
    description: &str,
    settings: &[(&str, &str)],
    notes: [&str; 5],
) -> ProfileDefinition {
    let [throughput, latency, durability, storage, use_case] = notes;
    ProfileDefinition {
        name: name.to_string(),
        description: description.to_string(),
        settings: settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        performance: PerformanceNotes {
            throughput: throughput.to_string(),
            latency: latency.to_string(),
            durability: durability.to_string(),
            storage: storage.to_string(),
            use_case: use_case.to_string(),
        },
    }
}

fn general_throughput() -> ProfileDefinition {
    profile(
        "general_throughput",
        "Balanced performance for most workloads (default)",
        &[
            // min.insync.replicas=2 needs RF >= 3
            ("min.insync.replicas", "2"),
            ("unclean.leader.election.enable", "false"),
            ("compression.type", "snappy"),
            // 3 days
            ("retention.ms", "259200000"),
            ("segment.ms", "3600000"),
            ("segment.bytes", "1073741824"),
            ("message.timestamp.type", "CreateTime"),
            ("max.message.bytes", "1048576"),
            // tombstones kept 24h
            ("delete.retention.ms", "86400000"),
            ("file.delete.delay.ms", "60000"),
            ("replica.lag.time.max.ms", "30000"),
        ],
        [
            "High - optimized for sustained throughput",
            "Medium - balanced approach",
            "High - min.insync.replicas=2, no unclean elections",
            "Medium - 3-day retention with snappy compression",
            "Most production workloads, event streaming",
        ],
    )
}

fn low_latency() -> ProfileDefinition {
    profile(
        "low_latency",
        "Optimized for minimal latency with relaxed durability",
        &[
            ("min.insync.replicas", "1"),
            ("unclean.leader.election.enable", "false"),
            ("compression.type", "lz4"),
            ("segment.ms", "1800000"),
            ("segment.bytes", "536870912"),
            // 1 day
            ("retention.ms", "86400000"),
            ("message.timestamp.type", "CreateTime"),
            ("max.message.bytes", "1048576"),
            ("delete.retention.ms", "3600000"),
            ("file.delete.delay.ms", "30000"),
            ("replica.lag.time.max.ms", "10000"),
        ],
        [
            "Medium - optimized for speed over throughput",
            "Low - smaller segments, lz4 compression, relaxed ISR",
            "Medium - min.insync.replicas=1 for faster writes",
            "Low - 1-day retention, frequent cleanup",
            "Real-time applications, trading systems, IoT",
        ],
    )
}

fn compaction_log() -> ProfileDefinition {
    profile(
        "compaction_log",
        "For key-based compacted topics (state stores, changelogs)",
        &[
            ("cleanup.policy", "compact"),
            ("min.cleanable.dirty.ratio", "0.5"),
            ("min.compaction.lag.ms", "0"),
            // force compaction weekly
            ("max.compaction.lag.ms", "604800000"),
            ("min.insync.replicas", "2"),
            ("unclean.leader.election.enable", "false"),
            ("compression.type", "snappy"),
            ("segment.ms", "3600000"),
            ("segment.bytes", "1073741824"),
            ("delete.retention.ms", "86400000"),
            ("message.timestamp.type", "CreateTime"),
            ("max.message.bytes", "1048576"),
            ("segment.index.bytes", "10485760"),
            ("file.delete.delay.ms", "60000"),
        ],
        [
            "Medium - compaction overhead affects performance",
            "Medium - standard settings with compaction",
            "High - designed for state store reliability",
            "Variable - depends on key cardinality and update patterns",
            "Kafka Streams state stores, CDC, configuration topics",
        ],
    )
}

fn long_retention() -> ProfileDefinition {
    profile(
        "long_retention",
        "Extended retention for audit/compliance scenarios",
        &[
            // 14 days, no size cap
            ("retention.ms", "1209600000"),
            ("retention.bytes", "-1"),
            ("min.insync.replicas", "2"),
            ("unclean.leader.election.enable", "false"),
            ("compression.type", "zstd"),
            ("segment.ms", "86400000"),
            ("segment.bytes", "2147483648"),
            ("message.timestamp.type", "CreateTime"),
            ("max.message.bytes", "1048576"),
            ("delete.retention.ms", "86400000"),
            ("file.delete.delay.ms", "300000"),
            ("segment.index.bytes", "52428800"),
            ("replica.lag.time.max.ms", "60000"),
        ],
        [
            "Medium - larger segments reduce overhead",
            "Medium-High - zstd compression adds CPU overhead",
            "High - optimized for long-term data retention",
            "High - 14-day retention with maximum compression",
            "Audit logs, compliance data, data lake ingestion",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> ConfigMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_builtin_profile_names() {
        let catalog = ProfileCatalog::builtin();
        assert_eq!(
            catalog.names(),
            vec![
                "general_throughput",
                "low_latency",
                "compaction_log",
                "long_retention"
            ]
        );
    }

    #[test]
    fn test_unknown_profile() {
        let catalog = ProfileCatalog::builtin();
        let err = catalog.get("turbo").unwrap_err();
        assert_eq!(err.kind(), "UnknownProfile");
        assert!(err.to_string().contains("turbo"));
        assert!(err.to_string().contains("general_throughput"));
    }

    #[test]
    fn test_general_throughput_defaults() {
        let catalog = ProfileCatalog::builtin();
        let profile = catalog.get("general_throughput").unwrap();
        assert_eq!(profile.get("compression.type"), Some("snappy"));
        assert_eq!(profile.get("min.insync.replicas"), Some("2"));
        assert_eq!(profile.get("retention.ms"), Some("259200000"));
        assert_eq!(profile.settings.len(), 11);
    }

    #[test]
    fn test_profile_keys_unique() {
        for profile in ProfileCatalog::builtin().list() {
            assert_eq!(
                profile.to_config_map().len(),
                profile.settings.len(),
                "duplicate key in {}",
                profile.name
            );
        }
    }

    #[test]
    fn test_merge_without_overrides_is_profile() {
        let catalog = ProfileCatalog::builtin();
        let profile = catalog.get("low_latency").unwrap();
        assert_eq!(merge(profile, &ConfigMap::new()), profile.to_config_map());
    }

    #[test]
    fn test_merge_override_wins_and_adds() {
        let catalog = ProfileCatalog::builtin();
        for profile in catalog.list() {
            let o = overrides(&[("retention.ms", "1"), ("x.custom.key", "on")]);
            let merged = merge(profile, &o);

            for (key, value) in &profile.settings {
                if !o.contains_key(key) {
                    assert_eq!(merged.get(key), Some(value));
                }
            }
            for (key, value) in &o {
                assert_eq!(merged.get(key), Some(value));
            }
            for key in merged.keys() {
                assert!(profile.get(key).is_some() || o.contains_key(key));
            }
        }
    }
}
