//! JSON documents printed on stdout.

use msk_admin_auth::AuthError;
use msk_admin_profiles::ProfileError;
use msk_admin_schema::RegistryError;
use msk_admin_topics::AdminError;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Typed failure kind carried anywhere in the error chain, or `"Error"`.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<AdminError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<RegistryError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<AuthError>() {
            return e.kind();
        }
        if let Some(e) = cause.downcast_ref::<ProfileError>() {
            return e.kind();
        }
    }
    "Error"
}

/// `{"status": "success", "operation": ...}` plus the payload's fields.
///
/// Object payloads are merged in; anything else lands under `result`.
pub fn success<T: Serialize>(operation: &str, payload: &T) -> anyhow::Result<Value> {
    let mut doc = Map::new();
    doc.insert("status".to_string(), json!("success"));
    doc.insert("operation".to_string(), json!(operation));

    match serde_json::to_value(payload)? {
        Value::Object(fields) => doc.extend(fields),
        Value::Null => {}
        other => {
            doc.insert("result".to_string(), other);
        }
    }
    Ok(Value::Object(doc))
}

pub fn failure(operation: &str, err: &anyhow::Error) -> Value {
    json!({
        "status": "error",
        "operation": operation,
        "error": format!("{err:#}"),
        "error_type": error_kind(err),
    })
}

pub fn print(doc: &Value) {
    match serde_json::to_string_pretty(doc) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{doc}"),
    }
}
