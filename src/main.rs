//! Command-line interface for msk-admin
//!
//! Every command prints one JSON document on stdout and exits non-zero on
//! failure. Logs go to stderr.
//!
//! # Usage Examples
//!
//! ## Topics
//! ```bash
//! msk-admin topics create orders -p 6 -r 3 --profile general_throughput
//! msk-admin topics create events --profile low_latency -c retention.ms=3600000
//! msk-admin topics describe orders
//! msk-admin topics alter-config orders -c retention.ms=1209600000
//! msk-admin topics delete orders --confirm
//! msk-admin topics profiles
//! ```
//!
//! ## Schemas
//! ```bash
//! msk-admin schema register -n user_event -f user_event.avsc --compat BACKWARD
//! msk-admin schema check-compatibility -n user_event -f user_event_v2.avsc
//! msk-admin schema versions -n user_event
//! ```
//!
//! ## Connection
//! Settings come from flags or environment variables (`KAFKA_BOOTSTRAP`,
//! `MSK_CLUSTER_ARN`, `KAFKA_SECURITY_PROTOCOL`, `KAFKA_SASL_MECHANISM`, ...).
//! `msk-admin config` shows the effective values with secrets masked.

use anyhow::Context;
use clap::{Parser, Subcommand};
use msk_admin::output;
use msk_admin::settings::{LogFormat, Settings};
use msk_admin::{connect, profiles::ConfigMap};
use msk_admin_profiles::{ProfileCatalog, DEFAULT_PROFILE};
use msk_admin_schema::CompatibilityMode;
use msk_admin_topics::{resolve_topic_spec, CreateTopicRequest, RdKafkaControlPlane, TopicAdmin};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "msk-admin")]
#[command(about = "Administer Amazon MSK topics, configuration profiles and Glue schemas")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Topic lifecycle and configuration
    Topics {
        #[command(subcommand)]
        command: TopicCommands,
    },

    /// Avro schemas in the Glue Schema Registry
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Check cluster connectivity
    Health,

    /// Show the effective settings, secrets masked
    Config,

    /// Show the tool version
    Version,
}

#[derive(Subcommand)]
enum TopicCommands {
    /// Create a topic from a configuration profile
    Create {
        name: String,

        /// Partition count (default: DEFAULT_PARTITIONS)
        #[arg(short, long)]
        partitions: Option<u32>,

        /// Replication factor (default: DEFAULT_REPLICATION_FACTOR)
        #[arg(short = 'r', long)]
        replication_factor: Option<u32>,

        /// Configuration profile
        #[arg(long, default_value = DEFAULT_PROFILE)]
        profile: String,

        /// Configuration override, repeatable (key=value)
        #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        overrides: Vec<(String, String)>,
    },

    /// List user topics
    List,

    /// Show a topic's configuration and partitions
    Describe { name: String },

    /// Change topic configuration, sending only the keys that differ
    AlterConfig {
        name: String,

        /// Desired value, repeatable (key=value)
        #[arg(short = 'c', long = "config", value_name = "KEY=VALUE", value_parser = parse_key_val, required = true)]
        config: Vec<(String, String)>,
    },

    /// Delete a topic (irreversible)
    Delete {
        name: String,

        /// Skip the interactive confirmation
        #[arg(long)]
        confirm: bool,
    },

    /// Show the available configuration profiles
    Profiles,
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Register a schema version
    Register {
        /// Avro schema file
        #[arg(short = 'f', long)]
        file: PathBuf,

        #[arg(short = 'n', long)]
        name: String,

        /// BACKWARD, FORWARD, FULL or NONE
        #[arg(long = "compat", default_value = "BACKWARD")]
        compatibility: String,
    },

    /// Show the latest or a specific schema version
    Get {
        #[arg(short = 'n', long)]
        name: String,

        #[arg(short = 'v', long = "version")]
        schema_version: Option<u32>,
    },

    /// List schemas in the registry
    List,

    /// Check a candidate schema against the latest version without registering it
    CheckCompatibility {
        #[arg(short = 'n', long)]
        name: String,

        #[arg(short = 'f', long)]
        file: PathBuf,
    },

    /// List every version of a schema
    Versions {
        #[arg(short = 'n', long)]
        name: String,
    },
}

impl Commands {
    fn operation(&self) -> &'static str {
        match self {
            Commands::Topics { command } => match command {
                TopicCommands::Create { .. } => "create_topic",
                TopicCommands::List => "list_topics",
                TopicCommands::Describe { .. } => "describe_topic",
                TopicCommands::AlterConfig { .. } => "alter_topic_config",
                TopicCommands::Delete { .. } => "delete_topic",
                TopicCommands::Profiles => "list_profiles",
            },
            Commands::Schema { command } => match command {
                SchemaCommands::Register { .. } => "register_schema",
                SchemaCommands::Get { .. } => "get_schema",
                SchemaCommands::List => "list_schemas",
                SchemaCommands::CheckCompatibility { .. } => "check_compatibility",
                SchemaCommands::Versions { .. } => "list_schema_versions",
            },
            Commands::Health => "health",
            Commands::Config => "config",
            Commands::Version => "version",
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{s}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match settings.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.settings);

    let operation = cli.command.operation();
    let is_health = matches!(cli.command, Commands::Health);
    let catalog = ProfileCatalog::builtin();

    match run(cli, &catalog).await {
        Ok(mut doc) => {
            if is_health {
                doc["status"] = json!("healthy");
            }
            output::print(&doc);
        }
        Err(e) => {
            tracing::error!(operation, error = %format!("{e:#}"), "Command failed");
            let mut doc = output::failure(operation, &e);
            if is_health {
                doc["status"] = json!("unhealthy");
            }
            output::print(&doc);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, catalog: &ProfileCatalog) -> anyhow::Result<Value> {
    let settings = cli.settings;
    let operation = cli.command.operation();

    match cli.command {
        Commands::Topics { command } => run_topics(command, &settings, catalog, operation).await,
        Commands::Schema { command } => run_schema(command, &settings, operation).await,
        Commands::Health => {
            let plane = connect::connect_control_plane(&settings).await?;
            let report = TopicAdmin::new(plane, catalog).health().await?;
            output::success(operation, &report)
        }
        Commands::Config => output::success(operation, &json!({ "settings": settings.masked() })),
        Commands::Version => output::success(
            operation,
            &json!({ "name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }),
        ),
    }
}

async fn topic_admin<'a>(
    settings: &Settings,
    catalog: &'a ProfileCatalog,
) -> anyhow::Result<TopicAdmin<'a, RdKafkaControlPlane>> {
    let plane = connect::connect_control_plane(settings).await?;
    Ok(TopicAdmin::new(plane, catalog))
}

async fn run_topics(
    command: TopicCommands,
    settings: &Settings,
    catalog: &ProfileCatalog,
    operation: &str,
) -> anyhow::Result<Value> {
    match command {
        TopicCommands::Create {
            name,
            partitions,
            replication_factor,
            profile,
            overrides,
        } => {
            let request = CreateTopicRequest {
                name,
                partitions: partitions.unwrap_or(settings.default_partitions),
                replication_factor: replication_factor
                    .unwrap_or(settings.default_replication_factor),
                profile: Some(profile.clone()),
                overrides: overrides.into_iter().collect(),
            };
            // Profile and config mistakes fail before any connection is made.
            resolve_topic_spec(catalog, &request)?;

            let spec = topic_admin(settings, catalog).await?.create(&request).await?;
            output::success(
                operation,
                &json!({
                    "topic": spec.name,
                    "partitions": spec.partitions,
                    "replication_factor": spec.replication_factor,
                    "profile": profile,
                    "config": spec.config,
                }),
            )
        }
        TopicCommands::List => {
            let topics = topic_admin(settings, catalog).await?.list().await?;
            output::success(operation, &json!({ "count": topics.len(), "topics": topics }))
        }
        TopicCommands::Describe { name } => {
            let description = topic_admin(settings, catalog).await?.describe(&name).await?;
            output::success(
                operation,
                &json!({
                    "topic": description.name,
                    "partitions": description.partition_count(),
                    "replication_factor": description.replication_factor(),
                    "config": description.config,
                    "partition_details": description.partitions,
                }),
            )
        }
        TopicCommands::AlterConfig { name, config } => {
            let desired: ConfigMap = config.into_iter().collect();
            let delta = topic_admin(settings, catalog)
                .await?
                .alter_config(&name, &desired)
                .await?;
            output::success(
                operation,
                &json!({
                    "topic": name,
                    "changes_applied": delta.len(),
                    "delta": delta.as_map(),
                }),
            )
        }
        TopicCommands::Delete { name, confirm } => {
            let confirmed = confirm || prompt_confirm(&name)?;
            connect::delete_topic(settings, catalog, &name, confirmed).await?;
            output::success(operation, &json!({ "topic": name, "deleted": true }))
        }
        TopicCommands::Profiles => {
            let profiles: Vec<Value> = catalog
                .list()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "description": p.description,
                        "config": p.to_config_map(),
                        "performance": p.performance,
                    })
                })
                .collect();
            output::success(
                operation,
                &json!({ "default_profile": DEFAULT_PROFILE, "profiles": profiles }),
            )
        }
    }
}

fn prompt_confirm(topic: &str) -> anyhow::Result<bool> {
    let mut stderr = std::io::stderr();
    write!(
        stderr,
        "Delete topic '{topic}'? This cannot be undone. [y/N]: "
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn read_schema_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file {}", path.display()))
}

async fn run_schema(
    command: SchemaCommands,
    settings: &Settings,
    operation: &str,
) -> anyhow::Result<Value> {
    // Local checks first: file and mode problems never reach AWS.
    let (body, mode) = match &command {
        SchemaCommands::Register {
            file,
            compatibility,
            ..
        } => (
            Some(read_schema_file(file)?),
            Some(compatibility.parse::<CompatibilityMode>()?),
        ),
        SchemaCommands::CheckCompatibility { file, .. } => (Some(read_schema_file(file)?), None),
        _ => (None, None),
    };
    if let Some(body) = &body {
        msk_admin_schema::validate_syntax(body)?;
    }

    let client = connect::connect_registry(settings).await?;

    match command {
        SchemaCommands::Register { name, .. } => {
            let body = body.unwrap_or_default();
            let version = client
                .register(&name, &body, mode.unwrap_or_default())
                .await?;
            output::success(
                operation,
                &json!({
                    "schema_name": version.schema_name,
                    "version": version.version,
                    "version_id": version.version_id,
                    "version_status": version.status,
                    "compatibility": mode.unwrap_or_default(),
                }),
            )
        }
        SchemaCommands::Get {
            name,
            schema_version,
        } => {
            let definition = client.get(&name, schema_version).await?;
            output::success(operation, &definition)
        }
        SchemaCommands::List => {
            let schemas = client.list_schemas().await?;
            output::success(
                operation,
                &json!({
                    "registry": settings.glue_registry_name,
                    "count": schemas.len(),
                    "schemas": schemas,
                }),
            )
        }
        SchemaCommands::CheckCompatibility { name, .. } => {
            let body = body.unwrap_or_default();
            let verdict = client.compatibility_report(&name, &body).await?;
            output::success(
                operation,
                &json!({
                    "schema_name": name,
                    "compatible": verdict.compatible,
                    "messages": verdict.messages,
                }),
            )
        }
        SchemaCommands::Versions { name } => {
            let versions = client.list_versions(&name).await?;
            output::success(
                operation,
                &json!({
                    "schema_name": name,
                    "count": versions.len(),
                    "versions": versions,
                }),
            )
        }
    }
}
