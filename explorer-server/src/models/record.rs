//! Schema-less record model
//!
//! Export files carry loosely shaped objects. A `Record` keeps the raw field
//! map as-is and only offers fallible accessors on top of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One ingested object: field name -> JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Wrap a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String field, `None` when missing or not a string.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Field with JS-style truthiness: null, false, 0 and "" count as absent.
    pub fn truthy(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| is_truthy(v))
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    /// Array field, empty when missing or not an array.
    pub fn array_field(&self, field: &str) -> &[Value] {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("id").filter(|v| !v.is_null())
    }

    /// Non-empty `href`.
    pub fn href(&self) -> Option<&str> {
        self.str_field("href").filter(|h| !h.is_empty())
    }

    /// `name`, then `hostname`, then "Unknown".
    pub fn display_name(&self) -> String {
        ["name", "hostname"]
            .iter()
            .find_map(|f| self.truthy(f))
            .map(text_of)
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Case-insensitive substring search across every field's text form.
    /// `needle` must already be lower-cased.
    pub fn any_field_contains(&self, needle: &str) -> bool {
        self.0
            .values()
            .any(|v| text_of(v).to_lowercase().contains(needle))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Text form of a value: strings verbatim, everything else as compact JSON.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
