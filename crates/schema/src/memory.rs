//! Process-local registry backend.
//!
//! Enforces compatibility with the same top-level field rule used for
//! dry-runs, so it behaves like a strict remote registry in tests and local
//! tooling.

use crate::backend::RegistryBackend;
use crate::compat::check_fields;
use crate::error::{RegistryError, Result};
use crate::types::{CompatibilityMode, SchemaDefinition, SchemaSummary, SchemaVersion};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

struct StoredVersion {
    id: String,
    body: String,
    created_at: DateTime<Utc>,
}

struct StoredSchema {
    compatibility: CompatibilityMode,
    versions: Vec<StoredVersion>,
    updated_at: DateTime<Utc>,
}

impl StoredSchema {
    fn version_meta(&self, name: &str, index: usize) -> SchemaVersion {
        SchemaVersion {
            schema_name: name.to_string(),
            version: index as u32 + 1,
            version_id: Some(self.versions[index].id.clone()),
            status: Some("AVAILABLE".to_string()),
            created_at: Some(self.versions[index].created_at),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRegistry {
    schemas: Mutex<BTreeMap<String, StoredSchema>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(name: &str, version: Option<u32>) -> RegistryError {
        RegistryError::SchemaNotFound {
            name: name.to_string(),
            version,
        }
    }
}

#[async_trait]
impl RegistryBackend for InMemoryRegistry {
    async fn register(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion> {
        let now = Utc::now();
        let mut schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());

        let schema = schemas.entry(name.to_string()).or_insert_with(|| StoredSchema {
            compatibility: mode,
            versions: Vec::new(),
            updated_at: now,
        });

        // The stored mode only changes once the body is accepted under it.
        if let Some(latest) = schema.versions.last() {
            if latest.body == body {
                debug!(schema = %name, "Body identical to latest version");
                schema.compatibility = mode;
                return Ok(schema.version_meta(name, schema.versions.len() - 1));
            }

            let verdict = check_fields(&latest.body, body, mode)?;
            if !verdict.compatible {
                return Err(RegistryError::IncompatibleSchema {
                    name: name.to_string(),
                    reason: verdict.reason(),
                });
            }
        }

        let number = schema.versions.len() + 1;
        schema.versions.push(StoredVersion {
            id: format!("{name}:{number}"),
            body: body.to_string(),
            created_at: now,
        });
        schema.compatibility = mode;
        schema.updated_at = now;
        Ok(schema.version_meta(name, number - 1))
    }

    async fn get(&self, name: &str, version: Option<u32>) -> Result<SchemaDefinition> {
        let schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
        let schema = schemas
            .get(name)
            .filter(|s| !s.versions.is_empty())
            .ok_or_else(|| Self::not_found(name, version))?;

        let number = version.unwrap_or(schema.versions.len() as u32);
        let stored = number
            .checked_sub(1)
            .and_then(|i| schema.versions.get(i as usize))
            .ok_or_else(|| Self::not_found(name, version))?;

        Ok(SchemaDefinition {
            name: name.to_string(),
            version: number,
            compatibility: schema.compatibility,
            body: stored.body.clone(),
        })
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<SchemaVersion>> {
        let schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
        let schema = schemas.get(name).ok_or_else(|| Self::not_found(name, None))?;
        Ok((0..schema.versions.len())
            .map(|i| schema.version_meta(name, i))
            .collect())
    }

    async fn list_schemas(&self) -> Result<Vec<SchemaSummary>> {
        let schemas = self.schemas.lock().unwrap_or_else(|e| e.into_inner());
        Ok(schemas
            .iter()
            .map(|(name, schema)| SchemaSummary {
                name: name.clone(),
                arn: None,
                status: Some("AVAILABLE".to_string()),
                description: None,
                latest_version: Some(schema.versions.len() as u32),
                updated_at: Some(schema.updated_at),
            })
            .collect())
    }
}
