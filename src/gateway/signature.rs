//! Canonical HMAC-SHA256 signing used by payOS for payment requests and
//! webhook `data` objects.
//!
//! The canonical form sorts the object's keys and joins `key=value` pairs with
//! `&`. Strings are taken verbatim, `null` becomes an empty string, and nested
//! arrays or objects are rendered as JSON with their object keys sorted.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn canonical_query(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| format!("{key}={}", render_value(&data[key.as_str()])))
        .collect::<Vec<_>>()
        .join("&")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s == "null" || s == "undefined" => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => sorted(value).to_string(),
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sorted(&map[key.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Hex-encoded HMAC-SHA256 of the canonical form.
pub fn sign(key: &str, data: &Map<String, Value>) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid checksum key: {e}"))?;
    mac.update(canonical_query(data).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of `signature` against the canonical HMAC.
pub fn verify(key: &str, data: &Map<String, Value>, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
        return false;
    };
    mac.update(canonical_query(data).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
