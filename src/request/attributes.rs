//! Entity attributes sent as the body of create/update requests

use serde_json::{Map, Number, Value};

/// Attribute value tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Nested list or object, sent as-is
    Collection(Value),
}

impl AttributeValue {
    /// Tag an untyped JSON value. `null` has no attribute kind and yields `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(AttributeValue::Boolean(b)),
            Value::String(s) => Some(AttributeValue::String(s)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(AttributeValue::Integer(i)),
                None => n.as_f64().map(AttributeValue::Float),
            },
            collection @ (Value::Array(_) | Value::Object(_)) => {
                Some(AttributeValue::Collection(collection))
            },
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Integer(i) => Value::Number((*i).into()),
            // Non-finite floats have no JSON representation
            AttributeValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Collection(v) => v.clone(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        AttributeValue::Integer(value.into())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<Vec<Value>> for AttributeValue {
    fn from(value: Vec<Value>) -> Self {
        AttributeValue::Collection(Value::Array(value))
    }
}

impl From<Map<String, Value>> for AttributeValue {
    fn from(value: Map<String, Value>) -> Self {
        AttributeValue::Collection(Value::Object(value))
    }
}

/// Ordered attribute mapping; re-inserting a key replaces the value in place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<AttributeValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Insert every entry of an untyped JSON object, tagging each value by
    /// its kind. `null` entries are skipped.
    pub fn extend_from_json(&mut self, map: Map<String, Value>) {
        for (key, value) in map {
            match AttributeValue::from_json(value) {
                Some(value) => self.insert(&key, value),
                None => tracing::debug!("Skipping null attribute: {}", key),
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object body, keys in insertion order
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }
}
