//! Topic lifecycle administration for Amazon MSK and other Kafka clusters.
//!
//! [`TopicAdmin`] resolves profiles, validates configuration, computes minimal
//! config deltas and polls new topics until they are ready. It talks to the
//! cluster only through the [`ControlPlane`] trait; [`RdKafkaControlPlane`] is
//! the librdkafka implementation, configured from a resolved
//! [`Credential`](msk_admin_auth::Credential) via [`ConnectionParams`].

pub mod control_plane;
pub mod error;
pub mod facade;
pub mod kafka;

pub use control_plane::{BrokerInfo, ControlPlane, PartitionInfo, TopicDescription, TopicSpec};
pub use error::{AdminError, Result};
pub use facade::{
    require_confirmation, resolve_topic_spec, CreateTopicRequest, HealthReport,
    PropagationPolicy, TopicAdmin,
};
pub use kafka::{
    full_override_set, AdminContext, ConnectionParams, RdKafkaControlPlane,
    DEFAULT_OPERATION_TIMEOUT,
};
