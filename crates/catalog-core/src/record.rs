//! Source records.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One record produced by a source backend.
///
/// `origin` identifies where the record came from (a file path, a command
/// line, `inline`) and is attached to errors raised while building entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub origin: String,
    pub fields: BTreeMap<String, Value>,
}

impl SourceRecord {
    pub fn new(origin: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            origin: origin.into(),
            fields,
        }
    }

    /// Build a record from a value, accepting only maps.
    pub fn from_value(origin: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Map(fields) => Some(Self::new(origin, fields)),
            _ => None,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The record as a single map value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }
}
