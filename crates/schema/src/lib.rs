//! Avro schema management for msk-admin.
//!
//! [`SchemaRegistryClient`] validates schema documents locally and delegates
//! storage and compatibility enforcement to a [`RegistryBackend`]:
//! [`GlueRegistry`] for AWS Glue Schema Registry, or [`InMemoryRegistry`].

pub mod backend;
pub mod client;
pub mod compat;
pub mod error;
pub mod glue;
pub mod memory;
pub mod types;

pub use backend::RegistryBackend;
pub use client::SchemaRegistryClient;
pub use compat::{check_fields, validate_syntax};
pub use error::{RegistryError, Result};
pub use glue::GlueRegistry;
pub use memory::InMemoryRegistry;
pub use types::{
    CompatibilityMode, CompatibilityVerdict, SchemaDefinition, SchemaSummary, SchemaVersion,
};
