//! JSON rendering of an entity for inspection tools.

use serde_json::{json, Map, Value};

use crate::model::{EntitySnapshot, SystemField};

/// Renders an entity as JSON.
///
/// System fields appear as `$name` keys, custom attributes under
/// `attributes`. The payload is embedded as JSON when it parses as JSON,
/// as text when it is UTF-8, and otherwise summarized as
/// `"<binary N bytes>"`. An empty payload is `null`.
pub fn describe_entity(entity: &EntitySnapshot) -> Value {
    let mut out = Map::new();
    for field in SystemField::ALL {
        let value = entity
            .system_field(field)
            .map(|v| json!(v))
            .unwrap_or(Value::Null);
        out.insert(format!("${}", field.name()), value);
    }
    out.insert("attributes".to_string(), json!(entity.attributes));
    out.insert("payload".to_string(), describe_payload(&entity.payload));
    Value::Object(out)
}

fn describe_payload(payload: &[u8]) -> Value {
    if payload.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_slice::<Value>(payload) {
        return parsed;
    }
    match std::str::from_utf8(payload) {
        Ok(text) => Value::String(text.to_string()),
        Err(_) => Value::String(format!("<binary {} bytes>", payload.len())),
    }
}
