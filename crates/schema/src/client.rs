//! Registry client: local validation in front of a [`RegistryBackend`].

use crate::backend::RegistryBackend;
use crate::compat::{check_fields, validate_syntax};
use crate::error::{RegistryError, Result};
use crate::types::{
    CompatibilityMode, CompatibilityVerdict, SchemaDefinition, SchemaSummary, SchemaVersion,
};
use tracing::{debug, info};

pub struct SchemaRegistryClient<B> {
    backend: B,
}

impl<B: RegistryBackend> SchemaRegistryClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register `body` as the next version of `name`.
    ///
    /// Malformed Avro is rejected before the backend is contacted. An
    /// incompatible body fails with the backend's explanation.
    pub async fn register(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion> {
        validate_syntax(body)?;
        info!(schema = %name, compatibility = %mode, "Registering schema");

        let version = self.backend.register(name, body, mode).await?;
        info!(schema = %name, version = version.version, "Schema registered");
        Ok(version)
    }

    /// The latest version of `name`, or `version` when given.
    pub async fn get(&self, name: &str, version: Option<u32>) -> Result<SchemaDefinition> {
        self.backend.get(name, version).await
    }

    /// Every version of `name`, oldest first.
    pub async fn list_versions(&self, name: &str) -> Result<Vec<SchemaVersion>> {
        self.backend.list_versions(name).await
    }

    pub async fn list_schemas(&self) -> Result<Vec<SchemaSummary>> {
        self.backend.list_schemas().await
    }

    /// Dry-run the check `register` would apply, without storing anything.
    ///
    /// The stored compatibility mode of `name` is used. An absent schema is
    /// compatible with any well-formed body.
    pub async fn compatibility_report(
        &self,
        name: &str,
        candidate: &str,
    ) -> Result<CompatibilityVerdict> {
        validate_syntax(candidate)?;

        let latest = match self.backend.get(name, None).await {
            Ok(latest) => latest,
            Err(RegistryError::SchemaNotFound { .. }) => {
                debug!(schema = %name, "No existing version; candidate is compatible");
                return Ok(CompatibilityVerdict::compatible());
            }
            Err(e) => return Err(e),
        };

        let verdict = check_fields(&latest.body, candidate, latest.compatibility)?;
        debug!(
            schema = %name,
            against_version = latest.version,
            compatibility = %latest.compatibility,
            compatible = verdict.compatible,
            "Compatibility checked"
        );
        Ok(verdict)
    }

    pub async fn check_compatibility(&self, name: &str, candidate: &str) -> Result<bool> {
        Ok(self.compatibility_report(name, candidate).await?.compatible)
    }
}
