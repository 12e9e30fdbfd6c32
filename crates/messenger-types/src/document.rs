use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, Value>;

// -- Collections --

pub const USERS: &str = "users";
pub const MESSAGES: &str = "messages";
pub const TYPING: &str = "typing";

/// A schemaless document as the store hands it out. Nothing outside the store
/// boundary should read `data` directly; parse it into a typed record instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, data: Fields) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    pub fn str_field(&self, field: &'static str) -> Result<&str, DocumentError> {
        match self.data.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(self.invalid(field, format!("expected a string, got {}", kind(other)))),
            None => Err(self.missing(field)),
        }
    }

    /// Optional string field. Absent, `null` and empty strings all read as `None`.
    pub fn opt_str_field(&self, field: &'static str) -> Result<Option<&str>, DocumentError> {
        match self.data.get(field) {
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Null) | None => Ok(None),
            Some(other) => Err(self.invalid(field, format!("expected a string, got {}", kind(other)))),
        }
    }

    pub fn bool_field_or(&self, field: &'static str, default: bool) -> Result<bool, DocumentError> {
        match self.data.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Null) | None => Ok(default),
            Some(other) => Err(self.invalid(field, format!("expected a bool, got {}", kind(other)))),
        }
    }

    /// Millisecond timestamp field.
    pub fn timestamp_field(&self, field: &'static str) -> Result<DateTime<Utc>, DocumentError> {
        let millis = match self.data.get(field) {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| self.invalid(field, format!("{n} is not an integer")))?,
            Some(other) => {
                return Err(self.invalid(field, format!("expected a timestamp, got {}", kind(other))));
            }
            None => return Err(self.missing(field)),
        };

        DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| self.invalid(field, format!("{millis} is out of range")))
    }

    pub fn missing(&self, field: &'static str) -> DocumentError {
        DocumentError::MissingField {
            collection: self.collection.clone(),
            id: self.id.clone(),
            field,
        }
    }

    pub fn invalid(&self, field: &'static str, reason: impl Into<String>) -> DocumentError {
        DocumentError::InvalidField {
            collection: self.collection.clone(),
            id: self.id.clone(),
            field,
            reason: reason.into(),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
