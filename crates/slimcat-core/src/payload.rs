//! Field access over the untyped key/value payload carried by a bridge command.
//!
//! The bridge is loose about scalar types: the same field can arrive as a
//! JSON number in one message and as a numeric string in the next. Every
//! accessor here accepts both shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};

/// One inbound bridge command, immutable after receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandPayload {
    fields: Map<String, Value>,
}

impl CommandPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parse a payload from its JSON text. Only JSON objects are accepted.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| BridgeError::InvalidPayload(e.to_string()))?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(BridgeError::InvalidPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// String form of a scalar field. `null`, arrays and objects read as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Nested map field, if present.
    pub fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.fields.get(key).and_then(Value::as_object)
    }

    pub fn require_string(&self, key: &str) -> Result<String> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(BridgeError::missing(key)),
            Some(value) => self.get_str(key).ok_or_else(|| {
                BridgeError::malformed(key, format!("expected a string, got {}", json_kind(value)))
            }),
        }
    }

    /// Character name field, trimmed. Blank names identify nobody.
    pub fn require_name(&self, key: &str) -> Result<String> {
        let name = self.require_string(key)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(BridgeError::malformed(key, "name is blank"));
        }
        Ok(name.to_string())
    }

    /// Integer field sent either as a JSON number or as a numeric string.
    pub fn require_i64(&self, key: &str) -> Result<i64> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(BridgeError::missing(key)),
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| BridgeError::malformed(key, format!("`{}` is not an integer", n))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| BridgeError::malformed(key, format!("`{}` is not an integer", s))),
            Some(other) => Err(BridgeError::malformed(
                key,
                format!("expected an integer, got {}", json_kind(other)),
            )),
        }
    }

    /// Like `require_i64`, but absent or `null` is `Ok(None)`.
    pub fn optional_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.require_i64(key).map(Some),
        }
    }

    /// Required string field with HTML entities decoded (`&amp;` -> `&`).
    pub fn require_decoded(&self, key: &str) -> Result<String> {
        let raw = self.require_string(key)?;
        Ok(decode_entities(&raw))
    }
}

impl From<Map<String, Value>> for CommandPayload {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

pub fn decode_entities(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
