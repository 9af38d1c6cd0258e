//! Topic lifecycle operations with profile resolution and readiness polling.

use crate::control_plane::{BrokerInfo, ControlPlane, TopicDescription, TopicSpec};
use crate::error::{AdminError, Result};
use msk_admin_profiles::{diff, merge, validate_config, ConfigDelta, ConfigMap, ProfileCatalog};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Bounded exponential backoff for waiting on a new topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub timeout: Duration,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Arguments to [`TopicAdmin::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateTopicRequest {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u32,
    /// Profile whose defaults seed the configuration. `None` applies overrides only.
    pub profile: Option<String>,
    pub overrides: ConfigMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub broker_count: usize,
    pub topic_count: usize,
    pub response_time_ms: u64,
    pub brokers: Vec<BrokerInfo>,
}

/// Deletion must be confirmed before anything touches the cluster.
pub fn require_confirmation(name: &str, confirmed: bool) -> Result<()> {
    if confirmed {
        Ok(())
    } else {
        Err(AdminError::ConfirmationRequired(name.to_string()))
    }
}

/// Apply the request's profile and overrides and validate the result.
///
/// Purely local: unknown profiles and invalid settings fail here, before any
/// broker call.
pub fn resolve_topic_spec(
    catalog: &ProfileCatalog,
    request: &CreateTopicRequest,
) -> Result<TopicSpec> {
    if request.partitions < 1 {
        return Err(AdminError::InvalidTopicSpec(format!(
            "partitions must be >= 1, got {}",
            request.partitions
        )));
    }
    if request.replication_factor < 1 {
        return Err(AdminError::InvalidTopicSpec(format!(
            "replication factor must be >= 1, got {}",
            request.replication_factor
        )));
    }

    let config = match &request.profile {
        Some(name) => merge(catalog.get(name)?, &request.overrides),
        None => request.overrides.clone(),
    };
    validate_config(&config, request.replication_factor)?;

    Ok(TopicSpec {
        name: request.name.clone(),
        partitions: request.partitions,
        replication_factor: request.replication_factor,
        config,
    })
}

/// Topic administration over a [`ControlPlane`].
pub struct TopicAdmin<'a, P> {
    plane: P,
    catalog: &'a ProfileCatalog,
    propagation: PropagationPolicy,
}

impl<'a, P: ControlPlane> TopicAdmin<'a, P> {
    pub fn new(plane: P, catalog: &'a ProfileCatalog) -> Self {
        Self {
            plane,
            catalog,
            propagation: PropagationPolicy::default(),
        }
    }

    pub fn with_propagation(mut self, policy: PropagationPolicy) -> Self {
        self.propagation = policy;
        self
    }

    pub fn plane(&self) -> &P {
        &self.plane
    }

    /// Resolve the final configuration without touching the cluster.
    pub fn resolve_spec(&self, request: &CreateTopicRequest) -> Result<TopicSpec> {
        resolve_topic_spec(self.catalog, request)
    }

    /// Create a topic and wait until every partition has a leader.
    pub async fn create(&self, request: &CreateTopicRequest) -> Result<TopicSpec> {
        let started = Instant::now();
        let spec = self.resolve_spec(request)?;

        info!(
            topic = %spec.name,
            partitions = spec.partitions,
            replication_factor = spec.replication_factor,
            profile = request.profile.as_deref().unwrap_or("none"),
            config_count = spec.config.len(),
            "Creating topic"
        );

        self.plane.create_topic(&spec).await?;
        self.wait_until_ready(&spec).await?;

        info!(
            topic = %spec.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Topic created"
        );
        Ok(spec)
    }

    async fn wait_until_ready(&self, spec: &TopicSpec) -> Result<TopicDescription> {
        let policy = self.propagation;
        let started = Instant::now();
        let mut backoff = policy.initial_backoff;

        loop {
            match self.plane.describe_topic(&spec.name).await {
                Ok(description) if description.is_ready(spec.partitions) => return Ok(description),
                Ok(_) | Err(AdminError::TopicNotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let waited = started.elapsed();
            if waited >= policy.timeout {
                warn!(topic = %spec.name, waited_ms = waited.as_millis() as u64, "Topic not ready in time");
                return Err(AdminError::PropagationTimeout {
                    topic: spec.name.clone(),
                    waited_ms: waited.as_millis() as u64,
                });
            }

            debug!(topic = %spec.name, backoff_ms = backoff.as_millis() as u64, "Waiting for topic");
            tokio::time::sleep(backoff.min(policy.timeout - waited)).await;
            backoff = (backoff * 2).min(policy.max_backoff);
        }
    }

    /// User topic names, sorted, internal (`__`-prefixed) topics excluded.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut topics: Vec<String> = self
            .plane
            .list_topics()
            .await?
            .into_iter()
            .filter(|name| !name.starts_with("__"))
            .collect();
        topics.sort();
        info!(topic_count = topics.len(), "Listed topics");
        Ok(topics)
    }

    pub async fn describe(&self, name: &str) -> Result<TopicDescription> {
        let description = self.plane.describe_topic(name).await?;
        info!(topic = %name, partitions = description.partition_count(), "Described topic");
        Ok(description)
    }

    /// Bring the topic's configuration to `desired`, sending only what differs.
    ///
    /// Returns the delta that was applied; an empty delta means nothing was sent.
    pub async fn alter_config(&self, name: &str, desired: &ConfigMap) -> Result<ConfigDelta> {
        let observed = self.plane.describe_topic(name).await?;
        validate_config(desired, observed.replication_factor().max(1))?;

        let delta = diff(desired, &observed.config);
        if delta.is_empty() {
            info!(topic = %name, "Topic configuration already up to date");
            return Ok(delta);
        }

        info!(topic = %name, changes = delta.len(), "Altering topic configuration");
        self.plane.alter_topic_config(name, &delta).await?;
        Ok(delta)
    }

    /// Delete a topic. Requires `confirmed`; a missing topic is an error.
    pub async fn delete(&self, name: &str, confirmed: bool) -> Result<()> {
        require_confirmation(name, confirmed)?;

        let exists = self.plane.list_topics().await?.iter().any(|t| t == name);
        if !exists {
            return Err(AdminError::TopicNotFound(name.to_string()));
        }

        self.plane.delete_topic(name).await?;
        info!(topic = %name, "Topic deleted");
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let started = Instant::now();
        let topic_count = self.list().await?.len();
        let brokers = self.plane.cluster_brokers().await?;

        Ok(HealthReport {
            broker_count: brokers.len(),
            topic_count,
            response_time_ms: started.elapsed().as_millis() as u64,
            brokers,
        })
    }
}
