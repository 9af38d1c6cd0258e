//! Minimal configuration change-sets.

use crate::ConfigMap;
use serde::Serialize;

/// Keys whose desired value differs from (or is missing in) the observed
/// configuration. Only these are sent to the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigDelta(ConfigMap);

impl ConfigDelta {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &ConfigMap {
        &self.0
    }

    pub fn into_inner(self) -> ConfigMap {
        self.0
    }
}

/// Compute the change-set that takes `observed` to `desired`.
///
/// Keys present only in `observed` are never part of the delta: alterations
/// add or overwrite, they do not reset unmanaged keys.
pub fn diff(desired: &ConfigMap, observed: &ConfigMap) -> ConfigDelta {
    ConfigDelta(
        desired
            .iter()
            .filter(|(key, value)| observed.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}
