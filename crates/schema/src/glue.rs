//! AWS Glue Schema Registry backend.

use crate::backend::RegistryBackend;
use crate::error::{RegistryError, Result};
use crate::types::{CompatibilityMode, SchemaDefinition, SchemaSummary, SchemaVersion};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_glue::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_glue::operation::get_schema_version::GetSchemaVersionOutput;
use aws_sdk_glue::types::{
    Compatibility, DataFormat, RegistryId, SchemaId, SchemaVersionNumber, SchemaVersionStatus,
};
use aws_sdk_glue::Client;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

const ENTITY_NOT_FOUND: &str = "EntityNotFoundException";
const ACCESS_DENIED: &str = "AccessDeniedException";
const INVALID_INPUT: &str = "InvalidInputException";

pub struct GlueRegistry {
    client: Client,
    registry_name: String,
    status_poll_interval: Duration,
    max_status_polls: u32,
}

impl GlueRegistry {
    pub fn new(sdk_config: &SdkConfig, registry_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(sdk_config),
            registry_name: registry_name.into(),
            status_poll_interval: Duration::from_secs(1),
            max_status_polls: 30,
        }
    }

    pub fn registry_name(&self) -> &str {
        &self.registry_name
    }

    fn registry_id(&self) -> RegistryId {
        RegistryId::builder()
            .registry_name(&self.registry_name)
            .build()
    }

    fn schema_id(&self, name: &str) -> SchemaId {
        SchemaId::builder()
            .registry_name(&self.registry_name)
            .schema_name(name)
            .build()
    }

    async fn create(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion> {
        info!(schema = %name, registry = %self.registry_name, compatibility = %mode, "Creating schema");
        let out = self
            .client
            .create_schema()
            .registry_id(self.registry_id())
            .schema_name(name)
            .data_format(DataFormat::Avro)
            .compatibility(to_glue(mode))
            .description(format!("Avro schema for {name}"))
            .schema_definition(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name, None))?;

        match out.schema_version_id() {
            Some(id) => {
                let settled = self.settled_version(id).await?;
                Ok(version_from_output(name, &settled))
            }
            None => Ok(SchemaVersion {
                schema_name: name.to_string(),
                version: out.latest_schema_version().unwrap_or(1) as u32,
                version_id: None,
                status: out.schema_version_status().map(|s| s.as_str().to_string()),
                created_at: None,
            }),
        }
    }

    /// Fetch a version by id, waiting while it is PENDING.
    async fn settled_version(&self, version_id: &str) -> Result<GetSchemaVersionOutput> {
        let mut polls = 0;
        loop {
            let out = self
                .client
                .get_schema_version()
                .schema_version_id(version_id)
                .send()
                .await
                .map_err(|e| map_sdk_error(e, version_id, None))?;
            if !matches!(out.status(), Some(SchemaVersionStatus::Pending)) {
                return Ok(out);
            }
            if polls >= self.max_status_polls {
                return Err(RegistryError::RegistryUnavailable(format!(
                    "schema version {version_id} still PENDING after {polls} checks"
                )));
            }
            polls += 1;
            debug!(version_id, polls, "Schema version still PENDING");
            tokio::time::sleep(self.status_poll_interval).await;
        }
    }

    async fn version_by_number(
        &self,
        name: &str,
        version: Option<u32>,
    ) -> Result<GetSchemaVersionOutput> {
        let number = match version {
            Some(v) => SchemaVersionNumber::builder()
                .version_number(i64::from(v))
                .build(),
            None => SchemaVersionNumber::builder().latest_version(true).build(),
        };

        self.client
            .get_schema_version()
            .schema_id(self.schema_id(name))
            .schema_version_number(number)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name, version))
    }

    async fn set_compatibility(&self, name: &str, compatibility: Compatibility) -> Result<()> {
        self.client
            .update_schema()
            .schema_id(self.schema_id(name))
            .compatibility(compatibility)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name, None))?;
        Ok(())
    }

    /// Register `body` as the next version under the compatibility mode
    /// already in effect. An identical latest body is returned as is.
    async fn register_version(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion> {
        let latest = self.version_by_number(name, None).await?;
        if latest.schema_definition().unwrap_or_default().trim() == body.trim() {
            let current = version_from_output(name, &latest);
            info!(schema = %name, version = current.version, "Schema already registered with same definition");
            return Ok(current);
        }

        let out = self
            .client
            .register_schema_version()
            .schema_id(self.schema_id(name))
            .schema_definition(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name, None))?;

        let registered = match out.schema_version_id() {
            Some(id) => version_from_output(name, &self.settled_version(id).await?),
            None => SchemaVersion {
                schema_name: name.to_string(),
                version: out.version_number().unwrap_or(0) as u32,
                version_id: None,
                status: out.status().map(|s| s.as_str().to_string()),
                created_at: None,
            },
        };

        if registered.status.as_deref() == Some(SchemaVersionStatus::Failure.as_str()) {
            return Err(RegistryError::IncompatibleSchema {
                name: name.to_string(),
                reason: format!(
                    "registry rejected version {} under {mode} compatibility (status FAILURE)",
                    registered.version
                ),
            });
        }

        info!(schema = %name, version = registered.version, "Registered schema version");
        Ok(registered)
    }
}

#[async_trait]
impl RegistryBackend for GlueRegistry {
    async fn register(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion> {
        let existing = match self
            .client
            .get_schema()
            .schema_id(self.schema_id(name))
            .send()
            .await
        {
            Ok(out) => out,
            Err(e) if e.code() == Some(ENTITY_NOT_FOUND) => {
                return self.create(name, body, mode).await;
            }
            Err(e) => return Err(map_sdk_error(e, name, None)),
        };

        // Glue checks a new version against the mode in effect, so the mode
        // is switched first and put back if the version is not accepted.
        let wanted = to_glue(mode);
        let restore = compatibility_to_restore(existing.compatibility(), &wanted);
        if existing.compatibility() != Some(&wanted) {
            info!(schema = %name, compatibility = %mode, "Updating schema compatibility");
            self.set_compatibility(name, wanted).await?;
        }

        let outcome = self.register_version(name, body, mode).await;
        if let (Err(err), Some(previous)) = (&outcome, restore) {
            info!(schema = %name, compatibility = %previous.as_str(), error = %err, "Restoring schema compatibility");
            if let Err(revert) = self.set_compatibility(name, previous).await {
                warn!(schema = %name, error = %revert, "Could not restore schema compatibility");
            }
        }
        outcome
    }
    async fn get(&self, name: &str, version: Option<u32>) -> Result<SchemaDefinition> {
        let out = self.version_by_number(name, version).await?;

        let schema = self
            .client
            .get_schema()
            .schema_id(self.schema_id(name))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, name, None))?;

        Ok(SchemaDefinition {
            name: name.to_string(),
            version: out.version_number().unwrap_or(0) as u32,
            compatibility: schema.compatibility().map(from_glue).unwrap_or_default(),
            body: out.schema_definition().unwrap_or_default().to_string(),
        })
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<SchemaVersion>> {
        let mut versions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_schema_versions()
                .schema_id(self.schema_id(name))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| map_sdk_error(e, name, None))?;

            versions.extend(page.schemas().iter().map(|item| SchemaVersion {
                schema_name: name.to_string(),
                version: item.version_number().unwrap_or(0) as u32,
                version_id: item.schema_version_id().map(str::to_string),
                status: item.status().map(|s| s.as_str().to_string()),
                created_at: item.created_time().and_then(parse_time),
            }));

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaSummary>> {
        let mut schemas = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = match self
                .client
                .list_schemas()
                .registry_id(self.registry_id())
                .set_next_token(next_token.take())
                .send()
                .await
            {
                Ok(page) => page,
                Err(e) if e.code() == Some(ENTITY_NOT_FOUND) => {
                    warn!(registry = %self.registry_name, "Registry not found");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(map_sdk_error(e, &self.registry_name, None)),
            };

            schemas.extend(page.schemas().iter().map(|item| SchemaSummary {
                name: item.schema_name().unwrap_or_default().to_string(),
                arn: item.schema_arn().map(str::to_string),
                status: item.schema_status().map(|s| s.as_str().to_string()),
                description: item.description().map(str::to_string),
                latest_version: None,
                updated_at: item.updated_time().and_then(parse_time),
            }));

            match page.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemas)
    }
}

/// Map a Glue SDK error onto the registry taxonomy, keeping the service text.
fn map_sdk_error<E>(err: E, name: &str, version: Option<u32>) -> RegistryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let message = err.message().unwrap_or_default().to_string();
    match err.code() {
        Some(ENTITY_NOT_FOUND) => RegistryError::SchemaNotFound {
            name: name.to_string(),
            version,
        },
        Some(ACCESS_DENIED) => RegistryError::PermissionDenied(message),
        Some(INVALID_INPUT) if message.to_ascii_lowercase().contains("compatib") => {
            RegistryError::IncompatibleSchema {
                name: name.to_string(),
                reason: message,
            }
        }
        Some(INVALID_INPUT) => RegistryError::InvalidSchemaSyntax(message),
        _ => RegistryError::RegistryUnavailable(DisplayErrorContext(&err).to_string()),
    }
}

fn version_from_output(name: &str, out: &GetSchemaVersionOutput) -> SchemaVersion {
    SchemaVersion {
        schema_name: name.to_string(),
        version: out.version_number().unwrap_or(0) as u32,
        version_id: out.schema_version_id().map(str::to_string),
        status: out.status().map(|s| s.as_str().to_string()),
        created_at: out.created_time().and_then(parse_time),
    }
}

/// The mode to put back if registration under `wanted` fails.
fn compatibility_to_restore(
    current: Option<&Compatibility>,
    wanted: &Compatibility,
) -> Option<Compatibility> {
    current.filter(|current| *current != wanted).cloned()
}

fn to_glue(mode: CompatibilityMode) -> Compatibility {
    match mode {
        CompatibilityMode::Backward => Compatibility::Backward,
        CompatibilityMode::Forward => Compatibility::Forward,
        CompatibilityMode::Full => Compatibility::Full,
        CompatibilityMode::None => Compatibility::None,
    }
}

fn from_glue(compatibility: &Compatibility) -> CompatibilityMode {
    match compatibility {
        Compatibility::Backward | Compatibility::BackwardAll => CompatibilityMode::Backward,
        Compatibility::Forward | Compatibility::ForwardAll => CompatibilityMode::Forward,
        Compatibility::Full | Compatibility::FullAll => CompatibilityMode::Full,
        _ => CompatibilityMode::None,
    }
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
