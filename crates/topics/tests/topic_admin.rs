//! TopicAdmin behavior against an in-memory control plane.

use async_trait::async_trait;
use msk_admin_profiles::{ConfigDelta, ConfigMap, ProfileCatalog};
use msk_admin_topics::{
    AdminError, BrokerInfo, ControlPlane, CreateTopicRequest, PartitionInfo, PropagationPolicy,
    Result, TopicAdmin, TopicDescription, TopicSpec,
};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

struct FakeTopic {
    spec: TopicSpec,
    // describe_topic calls left before leaders are elected
    pending_describes: usize,
}

#[derive(Default)]
struct FakePlane {
    topics: Mutex<BTreeMap<String, FakeTopic>>,
    alterations: Mutex<Vec<(String, ConfigDelta)>>,
    deleted: Mutex<Vec<String>>,
    leader_delay: usize,
    never_ready: bool,
}

impl FakePlane {
    fn with_topic(self, name: &str, partitions: u32, config: &[(&str, &str)]) -> Self {
        let spec = TopicSpec {
            name: name.to_string(),
            partitions,
            replication_factor: 3,
            config: map(config),
        };
        self.topics.lock().unwrap().insert(
            name.to_string(),
            FakeTopic {
                spec,
                pending_describes: 0,
            },
        );
        self
    }

    fn alterations(&self) -> Vec<(String, ConfigDelta)> {
        self.alterations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlPlane for FakePlane {
    async fn create_topic(&self, spec: &TopicSpec) -> Result<()> {
        let mut topics = self.topics.lock().unwrap();
        if topics.contains_key(&spec.name) {
            return Err(AdminError::TopicAlreadyExists(spec.name.clone()));
        }
        topics.insert(
            spec.name.clone(),
            FakeTopic {
                spec: spec.clone(),
                pending_describes: self.leader_delay,
            },
        );
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>> {
        Ok(self.topics.lock().unwrap().keys().cloned().collect())
    }

    async fn describe_topic(&self, name: &str) -> Result<TopicDescription> {
        let mut topics = self.topics.lock().unwrap();
        let topic = topics
            .get_mut(name)
            .ok_or_else(|| AdminError::TopicNotFound(name.to_string()))?;

        let leader = if self.never_ready || topic.pending_describes > 0 {
            topic.pending_describes = topic.pending_describes.saturating_sub(1);
            -1
        } else {
            1
        };

        Ok(TopicDescription {
            name: name.to_string(),
            config: topic.spec.config.clone(),
            partitions: (0..topic.spec.partitions as i32)
                .map(|id| PartitionInfo {
                    id,
                    leader,
                    replicas: vec![1, 2, 3],
                    isr: vec![1, 2, 3],
                    error: None,
                })
                .collect(),
        })
    }

    async fn alter_topic_config(&self, name: &str, delta: &ConfigDelta) -> Result<()> {
        let mut topics = self.topics.lock().unwrap();
        let topic = topics
            .get_mut(name)
            .ok_or_else(|| AdminError::TopicNotFound(name.to_string()))?;
        for (key, value) in delta.iter() {
            topic.spec.config.insert(key.clone(), value.clone());
        }
        self.alterations
            .lock()
            .unwrap()
            .push((name.to_string(), delta.clone()));
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        self.topics
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| AdminError::TopicNotFound(name.to_string()))?;
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn cluster_brokers(&self) -> Result<Vec<BrokerInfo>> {
        Ok((1..=3)
            .map(|id| BrokerInfo {
                id,
                host: format!("b-{id}.example.kafka.us-east-1.amazonaws.com"),
                port: 9098,
            })
            .collect())
    }
}

fn map(pairs: &[(&str, &str)]) -> ConfigMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn fast_polling() -> PropagationPolicy {
    PropagationPolicy {
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        timeout: Duration::from_millis(150),
    }
}

fn orders_request() -> CreateTopicRequest {
    CreateTopicRequest {
        name: "orders".to_string(),
        partitions: 6,
        replication_factor: 3,
        profile: Some("general_throughput".to_string()),
        overrides: ConfigMap::new(),
    }
}

#[tokio::test]
async fn create_orders_with_general_throughput() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let admin = TopicAdmin::new(FakePlane::default(), &catalog);

    let spec = admin.create(&orders_request()).await?;

    assert_eq!(spec.partitions, 6);
    assert_eq!(spec.replication_factor, 3);
    assert_eq!(spec.config.get("compression.type").unwrap(), "snappy");
    assert_eq!(spec.config.get("min.insync.replicas").unwrap(), "2");
    assert_eq!(spec.config.get("retention.ms").unwrap(), "259200000");

    let profile = catalog.get("general_throughput")?;
    assert_eq!(spec.config, profile.to_config_map());
    Ok(())
}

#[tokio::test]
async fn create_applies_overrides_over_profile() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let admin = TopicAdmin::new(FakePlane::default(), &catalog);

    let mut request = orders_request();
    request.overrides = map(&[("retention.ms", "604800000"), ("custom.key", "x")]);
    let spec = admin.create(&request).await?;

    assert_eq!(spec.config.get("retention.ms").unwrap(), "604800000");
    assert_eq!(spec.config.get("custom.key").unwrap(), "x");
    assert_eq!(spec.config.get("compression.type").unwrap(), "snappy");
    Ok(())
}

#[tokio::test]
async fn create_without_profile_uses_overrides_only() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let admin = TopicAdmin::new(FakePlane::default(), &catalog);

    let mut request = orders_request();
    request.profile = None;
    request.overrides = map(&[("cleanup.policy", "compact")]);
    let spec = admin.create(&request).await?;

    assert_eq!(spec.config, map(&[("cleanup.policy", "compact")]));
    Ok(())
}

#[tokio::test]
async fn create_waits_for_leaders() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane {
        leader_delay: 3,
        ..Default::default()
    };
    let admin = TopicAdmin::new(plane, &catalog).with_propagation(fast_polling());

    assert_ok!(admin.create(&orders_request()).await);
    Ok(())
}

#[tokio::test]
async fn create_times_out_when_never_ready() {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane {
        never_ready: true,
        ..Default::default()
    };
    let admin = TopicAdmin::new(plane, &catalog).with_propagation(fast_polling());

    let err = admin.create(&orders_request()).await.unwrap_err();
    match err {
        AdminError::PropagationTimeout { topic, waited_ms } => {
            assert_eq!(topic, "orders");
            assert!(waited_ms >= 150);
        }
        other => panic!("expected PropagationTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn create_existing_topic_fails() {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default().with_topic("orders", 6, &[]);
    let admin = TopicAdmin::new(plane, &catalog);

    let err = admin.create(&orders_request()).await.unwrap_err();
    assert_eq!(err.kind(), "TopicAlreadyExists");
}

#[tokio::test]
async fn create_rejects_bad_input_before_any_call() {
    let catalog = ProfileCatalog::builtin();
    let admin = TopicAdmin::new(FakePlane::default(), &catalog);

    let mut request = orders_request();
    request.profile = Some("turbo".to_string());
    assert_eq!(admin.create(&request).await.unwrap_err().kind(), "UnknownProfile");

    let mut request = orders_request();
    request.partitions = 0;
    assert_eq!(admin.create(&request).await.unwrap_err().kind(), "InvalidTopicSpec");

    let mut request = orders_request();
    request.replication_factor = 2;
    // general_throughput sets min.insync.replicas=2
    assert_eq!(admin.create(&request).await.unwrap_err().kind(), "InvalidTopicConfig");

    assert!(admin.plane().topics.lock().unwrap().is_empty());
}

#[tokio::test]
async fn list_hides_internal_topics_and_sorts() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default()
        .with_topic("weather", 3, &[])
        .with_topic("__consumer_offsets", 50, &[])
        .with_topic("flights", 3, &[]);
    let admin = TopicAdmin::new(plane, &catalog);

    assert_eq!(admin.list().await?, vec!["flights", "weather"]);
    Ok(())
}

#[tokio::test]
async fn describe_missing_topic_fails() {
    let catalog = ProfileCatalog::builtin();
    let admin = TopicAdmin::new(FakePlane::default(), &catalog);

    let err = admin.describe("ghost").await.unwrap_err();
    assert_eq!(err.kind(), "TopicNotFound");
}

#[tokio::test]
async fn alter_sends_single_key_delta() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default().with_topic(
        "orders",
        6,
        &[("retention.ms", "259200000"), ("compression.type", "snappy")],
    );
    let admin = TopicAdmin::new(plane, &catalog);

    let desired = map(&[("retention.ms", "1209600000"), ("compression.type", "snappy")]);
    let delta = admin.alter_config("orders", &desired).await?;

    assert_eq!(delta.len(), 1);
    assert_eq!(delta.get("retention.ms"), Some("1209600000"));

    let sent = admin.plane().alterations();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "orders");
    assert_eq!(sent[0].1, delta);
    Ok(())
}

#[tokio::test]
async fn alter_with_empty_delta_is_a_noop() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default().with_topic("orders", 6, &[("retention.ms", "259200000")]);
    let admin = TopicAdmin::new(plane, &catalog);

    let delta = admin
        .alter_config("orders", &map(&[("retention.ms", "259200000")]))
        .await?;

    assert!(delta.is_empty());
    assert!(admin.plane().alterations().is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_requires_confirmation() {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default().with_topic("orders", 6, &[]);
    let admin = TopicAdmin::new(plane, &catalog);

    let err = admin.delete("orders", false).await.unwrap_err();
    assert_eq!(err.kind(), "ConfirmationRequired");
    assert!(admin.plane().deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delete_missing_topic_fails() {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default().with_topic("orders", 6, &[]);
    let admin = TopicAdmin::new(plane, &catalog);

    assert_ok!(admin.delete("orders", true).await);
    let err = assert_err!(admin.delete("orders", true).await);
    assert_eq!(err.kind(), "TopicNotFound");
}

#[tokio::test]
async fn health_reports_brokers_and_topics() -> anyhow::Result<()> {
    let catalog = ProfileCatalog::builtin();
    let plane = FakePlane::default()
        .with_topic("orders", 6, &[])
        .with_topic("__consumer_offsets", 50, &[]);
    let admin = TopicAdmin::new(plane, &catalog);

    let report = admin.health().await?;
    assert_eq!(report.broker_count, 3);
    assert_eq!(report.topic_count, 1);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["brokers"][0]["port"], 9098);
    Ok(())
}
