use crate::response_path::{get_value, set_value, unset_value, ResponsePathError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const RESPONSES_ROOT: &str = "responses";
pub const VALIDATIONS_ROOT: &str = "validations";

static NULL: Value = Value::Null;

/// An interview: the `responses` tree and the parallel `validations` tree.
///
/// Paths passed to `response*`/`validation*` are relative to their root,
/// paths passed to `get`/`set`/`unset` are absolute (`responses.household.size`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterviewDocument {
    value: Value,
}

impl InterviewDocument {
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    pub fn from_value(value: Value) -> Self {
        let mut root = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for key in [RESPONSES_ROOT, VALIDATIONS_ROOT] {
            let entry = root
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
        }
        Self {
            value: Value::Object(root),
        }
    }

    pub fn from_responses(responses: Value) -> Self {
        let mut root = Map::new();
        root.insert(RESPONSES_ROOT.to_string(), responses);
        Self::from_value(Value::Object(root))
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn responses(&self) -> &Value {
        self.value.get(RESPONSES_ROOT).unwrap_or(&NULL)
    }

    pub fn validations(&self) -> &Value {
        self.value.get(VALIDATIONS_ROOT).unwrap_or(&NULL)
    }

    pub fn response(&self, path: &str) -> Option<&Value> {
        get_value(self.responses(), path)
    }

    pub fn response_str(&self, path: &str) -> Option<&str> {
        self.response(path).and_then(Value::as_str)
    }

    /// `None` when no validation has been recorded for `path`.
    pub fn validation(&self, path: &str) -> Option<bool> {
        get_value(self.validations(), path).and_then(Value::as_bool)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_value(&self.value, path)
    }

    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ResponsePathError> {
        set_value(&mut self.value, path, value)
    }

    pub fn unset(&mut self, path: &str) -> Option<Value> {
        unset_value(&mut self.value, path)
    }

    pub fn set_response(&mut self, path: &str, value: Value) -> Result<(), ResponsePathError> {
        self.set(&response_path(path), value)
    }

    pub fn set_validation(&mut self, path: &str, valid: bool) -> Result<(), ResponsePathError> {
        self.set(&validation_path(path), Value::Bool(valid))
    }
}

impl Default for InterviewDocument {
    fn default() -> Self {
        Self::new()
    }
}

pub fn response_path(path: &str) -> String {
    format!("{RESPONSES_ROOT}.{path}")
}

pub fn validation_path(path: &str) -> String {
    format!("{VALIDATIONS_ROOT}.{path}")
}

/// Strips a leading `responses.` so callers may pass either form.
pub fn strip_responses_prefix(path: &str) -> &str {
    path.strip_prefix(RESPONSES_ROOT)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(path)
}
