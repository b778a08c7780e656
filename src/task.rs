//! Task values handed to the recursive executor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of work: free text, or a mapping of keys to JSON-like values.
///
/// Tasks are never mutated once handed to a sandbox; a sub-task is always a
/// new value built by the generated code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Task {
    /// A free-text question or instruction.
    Text(String),
    /// A structured task such as `{"question": "...", "format": "number"}`.
    Structured(Map<String, Value>),
}

impl Task {
    /// Builds the conventional `{question, format}` task.
    pub fn question(question: impl Into<String>, format: Option<&str>) -> Self {
        let mut map = Map::new();
        map.insert("question".to_string(), Value::String(question.into()));
        if let Some(format) = format {
            map.insert("format".to_string(), Value::String(format.to_string()));
        }
        Self::Structured(map)
    }

    /// Parses a task from JSON text.
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
            .map_err(|kind| anyhow::anyhow!("A task must be a string or an object, got {kind}"))
    }

    /// The task as a JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Structured(map) => Value::Object(map.clone()),
        }
    }

    /// The task serialized as compact JSON, as shown to the oracle.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl TryFrom<Value> for Task {
    /// Name of the JSON type that was rejected.
    type Error = &'static str;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(map) => Ok(Self::Structured(map)),
            other => Err(json_kind(&other)),
        }
    }
}

/// Name of a JSON value's type, as scripts see it.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
