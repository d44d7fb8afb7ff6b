use crate::rules::context::RuleContext;
use odsurvey_core::ResponsePathError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RuleError {
    #[error("unknown registered {kind} `{name}`")]
    UnknownRule { kind: &'static str, name: String },
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("rule path error at `{path}`: {source}")]
    Path {
        path: String,
        #[source]
        source: ResponsePathError,
    },
    #[error("rule `{name}` failed at `{path}`: {message}")]
    Failed {
        name: String,
        path: String,
        message: String,
    },
}

/// Result of a conditional rule: visibility plus optional forced values for
/// the widget path and its custom path. A forced `null` clears the stored
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalOutcome {
    pub visible: bool,
    pub corrected_value: Option<Value>,
    pub custom_corrected_value: Option<Value>,
}

impl ConditionalOutcome {
    pub fn visible() -> Self {
        Self {
            visible: true,
            corrected_value: None,
            custom_corrected_value: None,
        }
    }

    pub fn hidden(corrected_value: Option<Value>) -> Self {
        Self {
            visible: false,
            corrected_value,
            custom_corrected_value: None,
        }
    }

    pub fn with_custom_correction(mut self, custom_corrected_value: Option<Value>) -> Self {
        self.custom_corrected_value = custom_corrected_value;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    pub failed: bool,
    pub message: String,
}

pub type ConditionFn = dyn Fn(&RuleContext<'_>) -> Result<bool, RuleError>;
pub type ConditionalFn = dyn Fn(&RuleContext<'_>) -> Result<ConditionalOutcome, RuleError>;
/// Receives the widget value and the custom value, both after correction.
pub type ValidationFn = dyn Fn(
    &RuleContext<'_>,
    Option<&Value>,
    Option<&Value>,
) -> Result<Vec<ValidationOutcome>, RuleError>;
pub type ValueFn = dyn Fn(&RuleContext<'_>) -> Result<Option<Value>, RuleError>;

/// Named rule functions for logic that has no declarative descriptor.
#[derive(Default)]
pub struct RuleRegistry {
    conditions: BTreeMap<String, Box<ConditionFn>>,
    conditionals: BTreeMap<String, Box<ConditionalFn>>,
    validations: BTreeMap<String, Box<ValidationFn>>,
    values: BTreeMap<String, Box<ValueFn>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_condition<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&RuleContext<'_>) -> Result<bool, RuleError> + 'static,
    {
        self.conditions.insert(name.into(), Box::new(rule));
        self
    }

    pub fn register_conditional<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&RuleContext<'_>) -> Result<ConditionalOutcome, RuleError> + 'static,
    {
        self.conditionals.insert(name.into(), Box::new(rule));
        self
    }

    pub fn register_validation<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(
                &RuleContext<'_>,
                Option<&Value>,
                Option<&Value>,
            ) -> Result<Vec<ValidationOutcome>, RuleError>
            + 'static,
    {
        self.validations.insert(name.into(), Box::new(rule));
        self
    }

    pub fn register_value<F>(&mut self, name: impl Into<String>, rule: F) -> &mut Self
    where
        F: Fn(&RuleContext<'_>) -> Result<Option<Value>, RuleError> + 'static,
    {
        self.values.insert(name.into(), Box::new(rule));
        self
    }

    pub fn condition(&self, name: &str) -> Result<&ConditionFn, RuleError> {
        self.conditions
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("condition", name))
    }

    pub fn conditional(&self, name: &str) -> Result<&ConditionalFn, RuleError> {
        self.conditionals
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("conditional", name))
    }

    pub fn validation(&self, name: &str) -> Result<&ValidationFn, RuleError> {
        self.validations
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("validation", name))
    }

    pub fn value(&self, name: &str) -> Result<&ValueFn, RuleError> {
        self.values
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown("value", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
            || self.conditionals.contains_key(name)
            || self.validations.contains_key(name)
            || self.values.contains_key(name)
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .field("conditionals", &self.conditionals.keys().collect::<Vec<_>>())
            .field("validations", &self.validations.keys().collect::<Vec<_>>())
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unknown(kind: &'static str, name: &str) -> RuleError {
    RuleError::UnknownRule {
        kind,
        name: name.to_string(),
    }
}
