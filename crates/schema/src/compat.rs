//! Local schema checks: Avro syntax and the top-level field rule.

use crate::error::{RegistryError, Result};
use crate::types::{CompatibilityMode, CompatibilityVerdict};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parse `body` as an Avro schema, rejecting anything malformed.
pub fn validate_syntax(body: &str) -> Result<apache_avro::Schema> {
    apache_avro::Schema::parse_str(body)
        .map_err(|e| RegistryError::InvalidSchemaSyntax(e.to_string()))
}

/// Top-level record fields, mapped to whether each declares a default.
/// Non-record schemas have no fields.
fn record_fields(body: &str) -> Result<BTreeMap<String, bool>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RegistryError::InvalidSchemaSyntax(e.to_string()))?;

    let fields = value
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| {
                    let name = field.get("name")?.as_str()?;
                    Some((name.to_string(), field.get("default").is_some()))
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(fields)
}

/// Compare `candidate` against `previous` under `mode`.
///
/// BACKWARD rejects removing a field that had no default; FORWARD rejects
/// adding a field without one; FULL applies both.
pub fn check_fields(
    previous: &str,
    candidate: &str,
    mode: CompatibilityMode,
) -> Result<CompatibilityVerdict> {
    if mode == CompatibilityMode::None {
        return Ok(CompatibilityVerdict::compatible());
    }

    let old = record_fields(previous)?;
    let new = record_fields(candidate)?;
    let mut messages = Vec::new();

    if mode.is_backward() {
        for (name, has_default) in &old {
            if !new.contains_key(name) && !has_default {
                messages.push(format!("required field '{name}' was removed"));
            }
        }
    }

    if mode.is_forward() {
        for (name, has_default) in &new {
            if !old.contains_key(name) && !has_default {
                messages.push(format!("field '{name}' was added without a default"));
            }
        }
    }

    if messages.is_empty() {
        Ok(CompatibilityVerdict::compatible())
    } else {
        Ok(CompatibilityVerdict::incompatible(messages))
    }
}
