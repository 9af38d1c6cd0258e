//! Wiring from settings to live broker and registry connections.

use crate::bootstrap::discover_bootstrap;
use crate::settings::Settings;
use anyhow::{bail, Context};
use msk_admin_auth::{
    load_sdk_config, resolve, resolve_aws_identity, resolve_keys, Credential, IamTokenProvider,
    Mechanism,
};
use msk_admin_profiles::ProfileCatalog;
use msk_admin_schema::{GlueRegistry, SchemaRegistryClient};
use msk_admin_topics::{require_confirmation, ConnectionParams, RdKafkaControlPlane, TopicAdmin};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolve the broker mechanism and its credential. No network access.
pub fn resolve_credential(settings: &Settings) -> anyhow::Result<(Mechanism, Credential)> {
    let mechanism = settings.mechanism()?;
    let credential = resolve(mechanism, &settings.to_settings_map())?;
    Ok((mechanism, credential))
}

/// Explicit bootstrap servers, or the ones MSK reports for the cluster ARN.
pub async fn bootstrap_servers(settings: &Settings, mechanism: Mechanism) -> anyhow::Result<String> {
    if let Some(bootstrap) = settings.bootstrap() {
        return Ok(bootstrap.to_string());
    }

    let Some(cluster_arn) = settings.cluster_arn() else {
        bail!("Neither KAFKA_BOOTSTRAP nor MSK_CLUSTER_ARN is set");
    };

    let identity = resolve_aws_identity(&settings.to_settings_map())?;
    let sdk_config = load_sdk_config(&identity).await;
    discover_bootstrap(&sdk_config, cluster_arn, mechanism).await
}

/// Open an admin connection to the cluster.
pub async fn connect_control_plane(settings: &Settings) -> anyhow::Result<RdKafkaControlPlane> {
    let (mechanism, credential) = resolve_credential(settings)?;

    let token_provider = match &credential {
        Credential::Iam(identity) => {
            let keys = resolve_keys(identity)
                .await
                .context("Failed to resolve AWS credentials for IAM authentication")?;
            let provider = IamTokenProvider::new(identity.region.clone(), keys);
            debug!(region = provider.region(), principal = provider.principal(), "IAM token provider ready");
            Some(Arc::new(provider))
        }
        Credential::Tls(_) | Credential::Scram(_) => None,
    };

    let bootstrap_servers = bootstrap_servers(settings, mechanism).await?;
    info!(mechanism = %mechanism, bootstrap = %bootstrap_servers, "Connecting to cluster");

    let params = ConnectionParams {
        bootstrap_servers,
        credential,
        token_provider,
        ca_location: settings.ssl_ca_location.clone(),
    };
    Ok(RdKafkaControlPlane::connect(&params)?)
}

/// Delete a topic. An unconfirmed request fails before any connection is made.
pub async fn delete_topic(
    settings: &Settings,
    catalog: &ProfileCatalog,
    name: &str,
    confirmed: bool,
) -> anyhow::Result<()> {
    require_confirmation(name, confirmed)?;
    let plane = connect_control_plane(settings).await?;
    TopicAdmin::new(plane, catalog).delete(name, confirmed).await?;
    Ok(())
}

/// Client for the configured Glue Schema Registry.
pub async fn connect_registry(
    settings: &Settings,
) -> anyhow::Result<SchemaRegistryClient<GlueRegistry>> {
    let identity = resolve_aws_identity(&settings.to_settings_map())?;
    let sdk_config = load_sdk_config(&identity).await;
    debug!(registry = %settings.glue_registry_name, region = %identity.region, "Using Glue Schema Registry");
    Ok(SchemaRegistryClient::new(GlueRegistry::new(
        &sdk_config,
        settings.glue_registry_name.clone(),
    )))
}
