//! Recursive JSON value used for request bodies and saved profiles.
//!
//! On the wire a `JsonValue` is plain JSON. The variant tags only exist in
//! memory, so decoding is where ambiguity gets resolved: serde tries the
//! variants in declaration order and the first one that fits wins.
//! That order is String, Int, Double, Bool, Object, Array.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A JSON object keyed by field name. Key order carries no meaning.
pub type JsonObject = BTreeMap<String, JsonValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Object(JsonObject),
    Array(Vec<JsonValue>),
}

impl JsonValue {
    /// Decode a single value from raw JSON text.
    pub fn from_json_text(text: &str) -> serde_json::Result<JsonValue> {
        serde_json::from_str(text)
    }

    /// Decode a JSON object from raw text, e.g. a pasted request body.
    pub fn object_from_json_text(text: &str) -> serde_json::Result<JsonObject> {
        serde_json::from_str(text)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short rendering for list views. Containers are summarised.
    pub fn display_text(&self) -> String {
        match self {
            JsonValue::String(s) => s.clone(),
            JsonValue::Int(i) => i.to_string(),
            JsonValue::Double(d) => d.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Object(map) => format!("{{{} fields}}", map.len()),
            JsonValue::Array(items) => format!("[{} items]", items.len()),
        }
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(text) => f.write_str(&text),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        JsonValue::String(value.to_string())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        JsonValue::String(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        JsonValue::Int(value)
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        JsonValue::Double(value)
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        JsonValue::Bool(value)
    }
}
