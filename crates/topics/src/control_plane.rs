//! The control-plane seam between topic administration and the cluster.

use crate::error::Result;
use async_trait::async_trait;
use msk_admin_profiles::{ConfigDelta, ConfigMap};
use serde::Serialize;

/// A topic's shape and configuration, either requested or observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u32,
    pub config: ConfigMap,
}

/// Per-partition placement as reported by cluster metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub id: i32,
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    pub error: Option<String>,
}

impl PartitionInfo {
    pub fn has_leader(&self) -> bool {
        self.leader >= 0 && self.error.is_none()
    }
}

/// Observed state of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDescription {
    pub name: String,
    /// Non-default configuration entries only.
    pub config: ConfigMap,
    #[serde(rename = "partition_details")]
    pub partitions: Vec<PartitionInfo>,
}

impl TopicDescription {
    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Replica count of the first partition; 0 for a topic with no partitions.
    pub fn replication_factor(&self) -> u32 {
        self.partitions
            .first()
            .map(|p| p.replicas.len() as u32)
            .unwrap_or(0)
    }

    /// All expected partitions exist and each has an elected leader.
    pub fn is_ready(&self, expected_partitions: u32) -> bool {
        self.partition_count() == expected_partitions
            && self.partitions.iter().all(PartitionInfo::has_leader)
    }

    pub fn to_spec(&self) -> TopicSpec {
        TopicSpec {
            name: self.name.clone(),
            partitions: self.partition_count(),
            replication_factor: self.replication_factor(),
            config: self.config.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerInfo {
    pub id: i32,
    pub host: String,
    pub port: i32,
}

/// Administrative operations against a live cluster.
///
/// Implementations map broker error codes onto the typed
/// [`AdminError`](crate::AdminError) variants, keeping the broker's text.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_topic(&self, spec: &TopicSpec) -> Result<()>;

    /// Every topic name, internal topics included.
    async fn list_topics(&self) -> Result<Vec<String>>;

    async fn describe_topic(&self, name: &str) -> Result<TopicDescription>;

    /// Apply exactly the keys in `delta`; other keys keep their values.
    async fn alter_topic_config(&self, name: &str, delta: &ConfigDelta) -> Result<()>;

    async fn delete_topic(&self, name: &str) -> Result<()>;

    async fn cluster_brokers(&self) -> Result<Vec<BrokerInfo>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(id: i32, leader: i32) -> PartitionInfo {
        PartitionInfo {
            id,
            leader,
            replicas: vec![1, 2, 3],
            isr: vec![1, 2, 3],
            error: None,
        }
    }

    #[test]
    fn test_ready_requires_all_leaders() {
        let mut description = TopicDescription {
            name: "orders".to_string(),
            config: ConfigMap::new(),
            partitions: vec![partition(0, 1), partition(1, -1)],
        };
        assert!(!description.is_ready(2));

        description.partitions[1].leader = 2;
        assert!(description.is_ready(2));
        assert!(!description.is_ready(3));
        assert_eq!(description.replication_factor(), 3);
    }

    #[test]
    fn test_partition_error_is_not_ready() {
        let mut p = partition(0, 1);
        p.error = Some("LeaderNotAvailable".to_string());
        assert!(!p.has_leader());
    }
}
