use log::{debug, error, warn};
use serde_json::{Map, Value};

use crate::schema::{CourseRecord, Field, Placeholder, RecordValidationError};

/// Turns raw extractor output into validated [`CourseRecord`]s.
#[derive(Clone, Debug)]
pub struct CourseParser {
    placeholder: Placeholder,
}

/// The shapes an extracted payload can take.
enum Payload {
    Single(Map<String, Value>),
    Many(Vec<Value>),
    Other(Value),
}
impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Single(map),
            Value::Array(items) => Self::Many(items),
            other => Self::Other(other),
        }
    }
}

impl CourseParser {
    pub fn new(placeholder: Placeholder) -> Self {
        Self { placeholder }
    }

    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    /// Never fails: malformed payloads and invalid entries are logged and skipped.
    pub fn parse_payload(&self, raw_payload: &str) -> Vec<CourseRecord> {
        let value: Value = match serde_json::from_str(raw_payload) {
            Ok(value) => value,
            Err(e) => {
                error!("Payload was not valid JSON: {e}");
                return vec![];
            }
        };
        let items = match Payload::from(value) {
            Payload::Single(map) => vec![Value::Object(map)],
            Payload::Many(items) => items,
            Payload::Other(other) => {
                warn!("Unexpected payload type: {}", json_type_name(&other));
                return vec![];
            }
        };

        let mut records = vec![];
        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(item) = item else {
                debug!("Ignoring non-object entry at index {index}");
                continue;
            };
            match self.normalise(&item) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Validation failure at index {index}: {e}"),
            }
        }
        records
    }

    fn normalise(&self, item: &Map<String, Value>) -> Result<CourseRecord, RecordValidationError> {
        CourseRecord::from_fields(|field: Field| {
            let text = coerce_to_string(item.get(field.name()));
            if text.is_empty() {
                self.placeholder.to_string()
            } else {
                text
            }
        })
    }
}

fn coerce_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(other) => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
