//! Bootstrap broker discovery through the MSK API.

use anyhow::{bail, Context};
use aws_config::SdkConfig;
use aws_sdk_kafka::operation::get_bootstrap_brokers::GetBootstrapBrokersOutput;
use msk_admin_auth::Mechanism;
use tracing::info;

/// Ask MSK for the broker string matching `mechanism`.
pub async fn discover_bootstrap(
    sdk_config: &SdkConfig,
    cluster_arn: &str,
    mechanism: Mechanism,
) -> anyhow::Result<String> {
    let client = aws_sdk_kafka::Client::new(sdk_config);
    let out = client
        .get_bootstrap_brokers()
        .cluster_arn(cluster_arn)
        .send()
        .await
        .with_context(|| format!("Failed to get bootstrap brokers for {cluster_arn}"))?;

    let brokers = select_brokers(&out, mechanism)?;
    info!(cluster_arn, mechanism = %mechanism, "Discovered bootstrap brokers");
    Ok(brokers)
}

/// Pick the broker string for `mechanism` out of a GetBootstrapBrokers response.
pub fn select_brokers(
    out: &GetBootstrapBrokersOutput,
    mechanism: Mechanism,
) -> anyhow::Result<String> {
    let brokers = match mechanism {
        Mechanism::Tls => out.bootstrap_broker_string_tls(),
        Mechanism::ScramSha512 => out.bootstrap_broker_string_sasl_scram(),
        Mechanism::IamOauthBearer => out.bootstrap_broker_string_sasl_iam(),
    };

    match brokers.map(str::trim).filter(|b| !b.is_empty()) {
        Some(brokers) => Ok(brokers.to_string()),
        None => bail!("Cluster has no bootstrap brokers for mechanism {mechanism}"),
    }
}
