//! Field coercion helpers shared by the device adapters
//!
//! Every lookup takes a list of candidate keys; the first key present with a
//! non-null value wins. Values that cannot be coerced yield the zero-value
//! instead of an error.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub(crate) type Payload = Map<String, Value>;

fn lookup<'a>(payload: &'a Payload, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

/// Coerce a JSON value to a finite number
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

pub(crate) fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

/// Numeric field, 0.0 when absent or non-numeric
pub(crate) fn number(payload: &Payload, keys: &[&str]) -> f64 {
    lookup(payload, keys).and_then(as_number).unwrap_or(0.0)
}

/// Non-negative integer count, truncated toward zero
pub(crate) fn count(payload: &Payload, keys: &[&str]) -> u32 {
    let n = number(payload, keys);
    if n <= 0.0 {
        0
    } else if n >= u32::MAX as f64 {
        u32::MAX
    } else {
        n as u32
    }
}

/// Value in 0.0-1.0
pub(crate) fn ratio(payload: &Payload, keys: &[&str]) -> f64 {
    number(payload, keys).clamp(0.0, 1.0)
}

pub(crate) fn flag(payload: &Payload, keys: &[&str]) -> bool {
    lookup(payload, keys).map(as_flag).unwrap_or(false)
}

/// String field; numbers are rendered as text (device numbers arrive either way)
pub(crate) fn text(payload: &Payload, keys: &[&str]) -> Option<String> {
    match lookup(payload, keys)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn object(payload: &Payload, keys: &[&str]) -> Map<String, Value> {
    match lookup(payload, keys) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Ordered numeric sequence; non-numeric entries become 0.0 so bucket positions hold
pub(crate) fn number_list(payload: &Payload, keys: &[&str]) -> Vec<f64> {
    match lookup(payload, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| as_number(item).unwrap_or(0.0))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn string_list(payload: &Payload, keys: &[&str]) -> Vec<String> {
    match lookup(payload, keys) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn device_id(payload: &Payload, keys: &[&str], fallback: &str) -> String {
    text(payload, keys)
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Payload timestamp, or the receive time when absent
pub(crate) fn timestamp(payload: &Payload, received_at: DateTime<Utc>) -> String {
    text(payload, &["timestamp"])
        .filter(|ts| !ts.trim().is_empty())
        .unwrap_or_else(|| received_at.to_rfc3339())
}
