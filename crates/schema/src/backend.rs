use crate::error::Result;
use crate::types::{CompatibilityMode, SchemaDefinition, SchemaSummary, SchemaVersion};
use async_trait::async_trait;

/// Storage and server-side enforcement behind [`SchemaRegistryClient`](crate::SchemaRegistryClient).
///
/// Bodies reaching a backend have already passed local syntax validation.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Register `body` as the next version of `name`, creating the schema on
    /// first use and setting its compatibility mode to `mode`.
    ///
    /// A body identical to the latest version returns that version unchanged.
    async fn register(
        &self,
        name: &str,
        body: &str,
        mode: CompatibilityMode,
    ) -> Result<SchemaVersion>;

    /// The given version, or the latest when `version` is `None`.
    async fn get(&self, name: &str, version: Option<u32>) -> Result<SchemaDefinition>;

    /// Every version of `name`, oldest first.
    async fn list_versions(&self, name: &str) -> Result<Vec<SchemaVersion>>;

    /// Every schema in the registry, sorted by name.
    async fn list_schemas(&self) -> Result<Vec<SchemaSummary>>;
}
