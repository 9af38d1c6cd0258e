//! [`ControlPlane`] over librdkafka's admin API.

use crate::control_plane::{BrokerInfo, ControlPlane, PartitionInfo, TopicDescription, TopicSpec};
use crate::error::{AdminError, Result};
use async_trait::async_trait;
use msk_admin_auth::{AuthError, Credential, IamTokenProvider};
use msk_admin_profiles::{ConfigDelta, ConfigMap};
use rdkafka::admin::{
    AdminClient, AdminOptions, AlterConfig, ConfigEntry, ConfigSource, NewTopic,
    ResourceSpecifier, TopicReplication,
};
use rdkafka::bindings as rdsys;
use rdkafka::client::{Client, ClientContext, OAuthToken};
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::metadata::{Metadata, MetadataTopic};
use rdkafka::types::RDKafkaRespErr;
use secrecy::ExposeSecret;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_ID: &str = "msk-admin";

/// Everything needed to open an admin connection.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub bootstrap_servers: String,
    pub credential: Credential,
    /// Required for the IAM mechanism, ignored otherwise.
    pub token_provider: Option<Arc<IamTokenProvider>>,
    /// CA bundle for SASL connections. Mutual TLS takes its CA from the credential.
    pub ca_location: Option<PathBuf>,
}

impl ConnectionParams {
    /// Translate the resolved credential into librdkafka properties.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mechanism = self.credential.mechanism();
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("client.id", CLIENT_ID)
            .set("security.protocol", mechanism.security_protocol());
        if let Some(sasl) = mechanism.sasl_mechanism() {
            config.set("sasl.mechanism", sasl);
        }

        match &self.credential {
            Credential::Tls(material) => {
                config
                    .set("ssl.ca.location", material.ca.to_string_lossy().into_owned())
                    .set(
                        "ssl.certificate.location",
                        material.cert.to_string_lossy().into_owned(),
                    )
                    .set("ssl.key.location", material.key.to_string_lossy().into_owned());
            }
            Credential::Scram(scram) => {
                config
                    .set("sasl.username", &scram.username)
                    .set("sasl.password", scram.password.expose_secret());
                self.apply_ca(&mut config);
            }
            Credential::Iam(_) => {
                if self.token_provider.is_none() {
                    return Err(AuthError::CredentialUnavailable(
                        "IAM mechanism selected but no token provider was initialised".to_string(),
                    )
                    .into());
                }
                self.apply_ca(&mut config);
            }
        }

        Ok(config)
    }

    fn apply_ca(&self, config: &mut ClientConfig) {
        if let Some(ca) = &self.ca_location {
            config.set("ssl.ca.location", ca.to_string_lossy().into_owned());
        }
    }
}

/// Client context that answers librdkafka's OAUTHBEARER refresh requests.
pub struct AdminContext {
    tokens: Option<Arc<IamTokenProvider>>,
}

impl AdminContext {
    pub fn new(tokens: Option<Arc<IamTokenProvider>>) -> Self {
        Self { tokens }
    }
}

impl ClientContext for AdminContext {
    const ENABLE_REFRESH_OAUTH_TOKEN: bool = true;

    fn generate_oauth_token(
        &self,
        _oauthbearer_config: Option<&str>,
    ) -> std::result::Result<OAuthToken, Box<dyn std::error::Error>> {
        let provider = self
            .tokens
            .as_ref()
            .ok_or("OAUTHBEARER token requested but no IAM token provider is configured")?;
        let (token, expires_at_secs) = provider.token()?;
        debug!(expires_at_secs, "Supplying IAM token to librdkafka");
        Ok(OAuthToken {
            token,
            principal_name: provider.principal().to_string(),
            lifetime_ms: expires_at_secs * 1000,
        })
    }
}

const MAIN_QUEUE_POLL: Duration = Duration::from_millis(100);

/// Drains the admin handle's main queue on a dedicated thread.
///
/// librdkafka posts OAUTHBEARER refresh requests to the main queue, which
/// `AdminClient` itself never polls. Without this the IAM token is never
/// supplied and every broker connection stalls in SASL authentication.
struct MainQueuePump {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MainQueuePump {
    fn start(admin: Weak<AdminClient<AdminContext>>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let should_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("msk-admin main queue".into())
            .spawn(move || {
                trace!("Main queue pump started");
                while !should_stop.load(Ordering::Relaxed) {
                    let Some(admin) = admin.upgrade() else {
                        break;
                    };
                    service_main_queue(admin.inner(), MAIN_QUEUE_POLL);
                }
                trace!("Main queue pump stopped");
            })
            .map_err(|e| AdminError::Kafka(format!("failed to start main queue thread: {e}")))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for MainQueuePump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Main queue pump panicked");
            }
        }
    }
}

/// Wait up to `timeout` for one main-queue event and handle it.
fn service_main_queue(client: &Client<AdminContext>, timeout: Duration) {
    let rk = client.native_ptr();
    // SAFETY: `rk` stays valid while `client` is borrowed; the queue
    // reference and the event are released before returning.
    unsafe {
        let queue = rdsys::rd_kafka_queue_get_main(rk);
        if queue.is_null() {
            return;
        }
        let event = rdsys::rd_kafka_queue_poll(queue, timeout.as_millis() as i32);
        rdsys::rd_kafka_queue_destroy(queue);
        if event.is_null() {
            return;
        }

        match rdsys::rd_kafka_event_type(event) {
            rdsys::RD_KAFKA_EVENT_OAUTHBEARER_TOKEN_REFRESH => supply_token(client),
            rdsys::RD_KAFKA_EVENT_ERROR => {
                let reason = CStr::from_ptr(rdsys::rd_kafka_event_error_string(event));
                warn!(reason = %reason.to_string_lossy(), "Kafka client error");
            }
            _ => {}
        }
        rdsys::rd_kafka_event_destroy(event);
    }
}

/// Answer a refresh request with a token from the context, or report the
/// failure so librdkafka retries.
fn supply_token(client: &Client<AdminContext>) {
    let rk = client.native_ptr();
    let outcome = client
        .context()
        .generate_oauth_token(None)
        .map_err(|e| e.to_string())
        .and_then(|token| {
            let value = CString::new(token.token).map_err(|e| e.to_string())?;
            let principal = CString::new(token.principal_name).map_err(|e| e.to_string())?;
            Ok((value, principal, token.lifetime_ms))
        });

    match outcome {
        Ok((value, principal, lifetime_ms)) => {
            let mut errstr = [0 as c_char; 512];
            // SAFETY: all pointers outlive the call; no extensions are passed.
            let code = unsafe {
                rdsys::rd_kafka_oauthbearer_set_token(
                    rk,
                    value.as_ptr(),
                    lifetime_ms,
                    principal.as_ptr(),
                    std::ptr::null_mut(),
                    0,
                    errstr.as_mut_ptr(),
                    errstr.len(),
                )
            };
            if code == RDKafkaRespErr::RD_KAFKA_RESP_ERR_NO_ERROR {
                debug!("Set OAUTHBEARER token on admin client");
            } else {
                // SAFETY: librdkafka NUL-terminates `errstr`.
                let reason = unsafe { CStr::from_ptr(errstr.as_ptr()) };
                warn!(reason = %reason.to_string_lossy(), "Rejected OAUTHBEARER token");
                unsafe { rdsys::rd_kafka_oauthbearer_set_token_failure(rk, errstr.as_ptr()) };
            }
        }
        Err(reason) => {
            warn!(%reason, "Could not produce OAUTHBEARER token");
            let message = CString::new(reason.replace('\0', " ")).unwrap_or_default();
            // SAFETY: `message` outlives the call.
            unsafe { rdsys::rd_kafka_oauthbearer_set_token_failure(rk, message.as_ptr()) };
        }
    }
}

/// Map a broker or client error code onto the admin taxonomy, keeping the
/// broker's text.
pub fn classify(code: RDKafkaErrorCode, subject: &str, detail: String) -> AdminError {
    use RDKafkaErrorCode::*;

    match code {
        TopicAlreadyExists => AdminError::TopicAlreadyExists(subject.to_string()),
        UnknownTopicOrPartition | UnknownTopic => AdminError::TopicNotFound(subject.to_string()),
        TopicAuthorizationFailed
        | ClusterAuthorizationFailed
        | SaslAuthenticationFailed
        | Authentication => AdminError::PermissionDenied(detail),
        BrokerNotAvailable | AllBrokersDown | BrokerTransportFailure | RequestTimedOut
        | OperationTimedOut => AdminError::BrokerUnavailable(detail),
        InvalidPartitions | InvalidReplicationFactor | InvalidConfig | InvalidTopic
        | PolicyViolation => AdminError::InvalidTopicSpec(detail),
        _ => AdminError::Kafka(detail),
    }
}

fn from_kafka(err: KafkaError, subject: &str) -> AdminError {
    match err.rdkafka_error_code() {
        Some(code) => classify(code, subject, err.to_string()),
        None => AdminError::Kafka(err.to_string()),
    }
}

fn partitions_of(topic: &MetadataTopic) -> Vec<PartitionInfo> {
    topic
        .partitions()
        .iter()
        .map(|p| PartitionInfo {
            id: p.id(),
            leader: p.leader(),
            replicas: p.replicas().to_vec(),
            isr: p.isr().to_vec(),
            error: p.error().map(|e| RDKafkaErrorCode::from(e).to_string()),
        })
        .collect()
}

/// Rebuild the full override set an AlterConfigs request must carry: every
/// `DynamicTopic` entry already on the topic, with `delta` applied on top.
///
/// An existing override with no readable value (the broker redacts
/// sensitive entries) fails the merge unless the delta replaces it, since
/// leaving it out of the request resets it to the default.
pub fn full_override_set(
    topic: &str,
    entries: impl IntoIterator<Item = ConfigEntry>,
    delta: &ConfigDelta,
) -> Result<ConfigMap> {
    let mut full = ConfigMap::new();
    let mut unreadable = Vec::new();
    for entry in entries {
        if !matches!(entry.source, ConfigSource::DynamicTopic) {
            continue;
        }
        match entry.value {
            Some(value) => {
                full.insert(entry.name, value);
            }
            None if delta.get(&entry.name).is_some() => {}
            None => unreadable.push(entry.name),
        }
    }
    if !unreadable.is_empty() {
        return Err(AdminError::UnreadableOverride {
            topic: topic.to_string(),
            keys: unreadable.join(", "),
        });
    }

    for (key, value) in delta.iter() {
        full.insert(key.clone(), value.clone());
    }
    Ok(full)
}

/// Admin connection to a live cluster.
pub struct RdKafkaControlPlane {
    // Declared first so the pump thread is joined before the client drops.
    _pump: MainQueuePump,
    admin: Arc<AdminClient<AdminContext>>,
    timeout: Duration,
}

impl RdKafkaControlPlane {
    pub fn connect(params: &ConnectionParams) -> Result<Self> {
        let context = AdminContext::new(params.token_provider.clone());
        let admin: AdminClient<AdminContext> = params
            .client_config()?
            .create_with_context(context)
            .map_err(|e| from_kafka(e, &params.bootstrap_servers))?;

        info!(
            bootstrap = %params.bootstrap_servers,
            mechanism = %params.credential.mechanism(),
            "Initialized Kafka admin client"
        );
        let admin = Arc::new(admin);
        let pump = MainQueuePump::start(Arc::downgrade(&admin))?;
        Ok(Self {
            _pump: pump,
            admin,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn options(&self) -> AdminOptions {
        AdminOptions::new().operation_timeout(Some(self.timeout))
    }

    /// Fetch cluster metadata off the async runtime and extract what the
    /// caller needs before the handle is dropped.
    async fn with_metadata<T, F>(&self, topic: Option<&str>, extract: F) -> Result<T>
    where
        F: FnOnce(&Metadata) -> T + Send + 'static,
        T: Send + 'static,
    {
        let admin = Arc::clone(&self.admin);
        let timeout = self.timeout;
        let topic = topic.map(str::to_string);
        let subject = topic.clone().unwrap_or_else(|| "cluster metadata".to_string());

        tokio::task::spawn_blocking(move || {
            admin
                .inner()
                .fetch_metadata(topic.as_deref(), timeout)
                .map(|metadata| extract(&metadata))
        })
        .await
        .map_err(|e| AdminError::Kafka(format!("metadata task failed: {e}")))?
        .map_err(|e| from_kafka(e, &subject))
    }

    async fn describe_config_resource(&self, name: &str) -> Result<rdkafka::admin::ConfigResource> {
        let results = self
            .admin
            .describe_configs(&[ResourceSpecifier::Topic(name)], &self.options())
            .await
            .map_err(|e| from_kafka(e, name))?;

        results
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::Kafka(format!("empty DescribeConfigs response for '{name}'")))?
            .map_err(|code| classify(code, name, format!("DescribeConfigs for '{name}': {code}")))
    }
}

#[async_trait]
impl ControlPlane for RdKafkaControlPlane {
    async fn create_topic(&self, spec: &TopicSpec) -> Result<()> {
        let mut topic = NewTopic::new(
            &spec.name,
            spec.partitions as i32,
            TopicReplication::Fixed(spec.replication_factor as i32),
        );
        for (key, value) in &spec.config {
            topic = topic.set(key, value);
        }

        let results = self
            .admin
            .create_topics(&[topic], &self.options())
            .await
            .map_err(|e| from_kafka(e, &spec.name))?;

        for result in results {
            if let Err((topic, code)) = result {
                return Err(classify(
                    code,
                    &topic,
                    format!("Failed to create topic {topic}: {code}"),
                ));
            }
        }
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>> {
        self.with_metadata(None, |metadata| {
            metadata
                .topics()
                .iter()
                .map(|t| t.name().to_string())
                .collect()
        })
        .await
    }

    async fn describe_topic(&self, name: &str) -> Result<TopicDescription> {
        let wanted = name.to_string();
        let found = self
            .with_metadata(Some(name), move |metadata| {
                metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == wanted)
                    .map(|t| (t.error().map(RDKafkaErrorCode::from), partitions_of(t)))
            })
            .await?;

        let partitions = match found {
            None => return Err(AdminError::TopicNotFound(name.to_string())),
            Some((Some(code), _)) => {
                return Err(classify(code, name, format!("Metadata for '{name}': {code}")))
            }
            Some((None, partitions)) => partitions,
        };

        let config = self
            .describe_config_resource(name)
            .await?
            .entries
            .into_iter()
            .filter(|e| !e.is_default)
            .filter_map(|e| e.value.map(|v| (e.name, v)))
            .collect();

        Ok(TopicDescription {
            name: name.to_string(),
            config,
            partitions,
        })
    }

    async fn alter_topic_config(&self, name: &str, delta: &ConfigDelta) -> Result<()> {
        // AlterConfigs replaces the topic's whole override set, so the
        // existing overrides are resent alongside the delta.
        let existing = self.describe_config_resource(name).await?.entries;
        let full = full_override_set(name, existing, delta)?;

        let mut alter = AlterConfig::new(ResourceSpecifier::Topic(name));
        for (key, value) in &full {
            alter = alter.set(key, value);
        }

        let results = self
            .admin
            .alter_configs(&[alter], &self.options())
            .await
            .map_err(|e| from_kafka(e, name))?;

        for result in results {
            result.map_err(|(_, code)| {
                classify(code, name, format!("AlterConfigs for '{name}': {code}"))
            })?;
        }
        Ok(())
    }

    async fn delete_topic(&self, name: &str) -> Result<()> {
        let results = self
            .admin
            .delete_topics(&[name], &self.options())
            .await
            .map_err(|e| from_kafka(e, name))?;

        for result in results {
            if let Err((topic, code)) = result {
                return Err(classify(
                    code,
                    &topic,
                    format!("Failed to delete topic {topic}: {code}"),
                ));
            }
        }
        Ok(())
    }

    async fn cluster_brokers(&self) -> Result<Vec<BrokerInfo>> {
        self.with_metadata(None, |metadata| {
            metadata
                .brokers()
                .iter()
                .map(|b| BrokerInfo {
                    id: b.id(),
                    host: b.host().to_string(),
                    port: b.port(),
                })
                .collect()
        })
        .await
    }
}
