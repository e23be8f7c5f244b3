//! Key-value payloads carried opaquely by a channel transport

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primitive value stored under a payload key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    UInt(u64),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Borrow the value as text, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an unsigned 32-bit integer.
    ///
    /// Negative, fractional, out-of-range and non-numeric values yield `None`.
    /// Floats are accepted only when they carry an exact integral value.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt(n) => u32::try_from(*n).ok(),
            Value::Int(n) => u32::try_from(*n).ok(),
            Value::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 {
                    Some(*f as u32)
                } else {
                    None
                }
            }
            Value::Bool(_) | Value::Str(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::UInt(n as u64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A single message as seen by the transport: string keys to primitive values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, Value>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Text stored under `key`; `None` if absent or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Unsigned 32-bit integer stored under `key`; `None` if absent or invalid
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(Value::as_u32)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_interpretation() {
        assert_eq!(Value::UInt(24).as_u32(), Some(24));
        assert_eq!(Value::Int(80).as_u32(), Some(80));
        assert_eq!(Value::Int(-1).as_u32(), None);
        assert_eq!(Value::UInt(u64::from(u32::MAX) + 1).as_u32(), None);
        assert_eq!(Value::Float(30.0).as_u32(), Some(30));
        assert_eq!(Value::Float(30.5).as_u32(), None);
        assert_eq!(Value::Float(f64::NAN).as_u32(), None);
        assert_eq!(Value::Str("24".to_string()).as_u32(), None);
    }

    #[test]
    fn test_payload_json_shape() {
        let payload = Payload::new()
            .with("command", "resize")
            .with("rows", 24u32)
            .with("columns", 80u32);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"command": "resize", "rows": 24, "columns": 80})
        );

        let parsed: Payload =
            serde_json::from_str(r#"{"command":"resize","rows":-3,"columns":2.5}"#).unwrap();
        assert_eq!(parsed.get("rows"), Some(&Value::Int(-3)));
        assert_eq!(parsed.get("columns"), Some(&Value::Float(2.5)));
        assert_eq!(parsed.get_u32("rows"), None);
    }
}
