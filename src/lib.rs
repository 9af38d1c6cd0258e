//! msk-admin
//!
//! Control-plane administration for Amazon MSK: topic lifecycle with
//! configuration profiles, TLS / SCRAM / IAM authentication, and Avro schemas
//! in AWS Glue Schema Registry.
//!
//! # Crates
//!
//! - `msk_admin_profiles` - profile catalog, config merge/diff, validation
//! - `msk_admin_auth` - credential resolution and IAM token signing
//! - `msk_admin_topics` - control plane and the `TopicAdmin` facade
//! - `msk_admin_schema` - schema registry client and backends
//!
//! This package adds settings, bootstrap discovery and connection wiring for
//! the `msk-admin` binary.
//!
//! # CLI Usage
//!
//! ```bash
//! # Create a topic from a profile with an override
//! msk-admin topics create orders -p 6 -r 3 --profile general_throughput -c retention.ms=604800000
//!
//! # Change one setting
//! msk-admin topics alter-config orders -c retention.ms=1209600000
//!
//! # Register a schema
//! msk-admin schema register -n user_event -f user_event.avsc --compat BACKWARD
//! ```

pub mod bootstrap;
pub mod connect;
pub mod output;
pub mod settings;

pub use settings::{LogFormat, Settings};

pub use msk_admin_auth as auth;
pub use msk_admin_profiles as profiles;
pub use msk_admin_schema as schema;
pub use msk_admin_topics as topics;
