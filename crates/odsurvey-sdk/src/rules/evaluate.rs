use crate::questionnaire::QuestionWidget;
use crate::rules::context::RuleContext;
use crate::rules::descriptors::{
    Condition, ConditionalRule, HiddenValue, ValidationRule, ValueRule,
};
use crate::rules::registry::{ConditionalOutcome, RuleError, RuleRegistry};
use chrono::NaiveDate;
use odsurvey_core::{placeholder_paths, response_path, InterviewDocument};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetEvaluation {
    pub visible: bool,
    /// Value after any correction.
    pub value: Option<Value>,
    pub valid: bool,
    /// Set only when it differs from the stored value; `null` clears it.
    pub corrected_value: Option<Value>,
    pub custom_value: Option<Value>,
    pub custom_corrected_value: Option<Value>,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetDescription {
    pub evaluation: WidgetEvaluation,
    pub choices: Vec<Value>,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleDependencies {
    All,
    Paths(BTreeSet<String>),
}

impl RuleDependencies {
    /// Adds response paths; no-op when the widget already depends on
    /// everything.
    pub fn extend<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let RuleDependencies::Paths(own) = self {
            own.extend(paths);
        }
    }
}

pub fn evaluate_condition(
    condition: &Condition,
    context: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Result<bool, RuleError> {
    let matched = match condition {
        Condition::Always => true,
        Condition::Never => false,
        Condition::IsBlank { path } => is_blank(context.lookup(path.as_deref())?),
        Condition::NotBlank { path } => !is_blank(context.lookup(path.as_deref())?),
        Condition::Equals { path, value } => {
            lookup_equals(context.lookup(path.as_deref())?, value)
        }
        Condition::NotEquals { path, value } => {
            !lookup_equals(context.lookup(path.as_deref())?, value)
        }
        Condition::OneOf { path, values } => {
            let current = context.lookup(path.as_deref())?;
            values.iter().any(|value| lookup_equals(current, value))
        }
        Condition::GreaterThan { path, value } => {
            as_number(context.lookup(path.as_deref())?).is_some_and(|number| number > *value)
        }
        Condition::LessThan { path, value } => {
            as_number(context.lookup(path.as_deref())?).is_some_and(|number| number < *value)
        }
        Condition::Matches { path, pattern } => {
            let regex = Regex::new(pattern).map_err(|err| RuleError::InvalidPattern {
                pattern: pattern.clone(),
                reason: err.to_string(),
            })?;
            context
                .lookup(path.as_deref())?
                .and_then(scalar_text)
                .is_some_and(|text| regex.is_match(&text))
        }
        Condition::All { conditions } => {
            for condition in conditions {
                if !evaluate_condition(condition, context, registry)? {
                    return Ok(false);
                }
            }
            true
        }
        Condition::Any { conditions } => {
            for condition in conditions {
                if evaluate_condition(condition, context, registry)? {
                    return Ok(true);
                }
            }
            false
        }
        Condition::Not { condition } => !evaluate_condition(condition, context, registry)?,
        Condition::Registered { name } => registry.condition(name)?(context)?,
    };
    Ok(matched)
}

pub fn evaluate_conditional(
    rule: Option<&ConditionalRule>,
    context: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Result<ConditionalOutcome, RuleError> {
    match rule {
        None => Ok(ConditionalOutcome::visible()),
        Some(ConditionalRule::Registered { registered }) => {
            registry.conditional(registered)?(context)
        }
        Some(ConditionalRule::Declarative { when, on_hidden }) => {
            if evaluate_condition(when, context, registry)? {
                return Ok(ConditionalOutcome::visible());
            }
            let corrected_value = match on_hidden {
                HiddenValue::Keep => None,
                HiddenValue::Clear => Some(Value::Null),
                HiddenValue::Assign { value } => Some(value.clone()),
            };
            let custom_corrected_value = match on_hidden {
                HiddenValue::Keep => None,
                HiddenValue::Clear | HiddenValue::Assign { .. } => Some(Value::Null),
            };
            Ok(ConditionalOutcome::hidden(corrected_value)
                .with_custom_correction(custom_corrected_value))
        }
    }
}

/// Computes visibility, validity and any correction for a question at
/// `context.path` and its custom path. The document is never mutated;
/// validations run against the corrected values.
pub fn evaluate_widget(
    widget: &QuestionWidget,
    context: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Result<WidgetEvaluation, RuleError> {
    let outcome = evaluate_conditional(widget.conditional.as_ref(), context, registry)?;
    let current = context.value();
    let corrected_value = outcome
        .corrected_value
        .filter(|target| differs_from_stored(current, target));
    let custom_current = context.custom_value();
    let custom_corrected_value = outcome
        .custom_corrected_value
        .filter(|_| context.custom_path.is_some())
        .filter(|target| differs_from_stored(custom_current, target));

    let value = corrected_or_current(corrected_value.as_ref(), current);
    let custom_value = corrected_or_current(custom_corrected_value.as_ref(), custom_current);

    if !outcome.visible {
        return Ok(WidgetEvaluation {
            visible: false,
            value,
            valid: true,
            corrected_value,
            custom_value,
            custom_corrected_value,
            messages: Vec::new(),
        });
    }

    let corrections = [
        corrected_value.as_ref().map(|target| (context.path, target)),
        context.custom_path.zip(custom_corrected_value.as_ref()),
    ];
    let scratch;
    let validation_context = if corrections.iter().any(Option::is_some) {
        scratch = with_corrections(context.document, corrections.iter().flatten().copied());
        RuleContext::new(&scratch, context.path, context.config)
            .with_custom_path(context.custom_path)
    } else {
        *context
    };
    let messages = run_validations(
        &widget.validations,
        value.as_ref(),
        custom_value.as_ref(),
        &validation_context,
        registry,
    )?;

    Ok(WidgetEvaluation {
        visible: true,
        value,
        valid: messages.is_empty(),
        corrected_value,
        custom_value,
        custom_corrected_value,
        messages,
    })
}

fn corrected_or_current(corrected: Option<&Value>, current: Option<&Value>) -> Option<Value> {
    match corrected {
        Some(Value::Null) => None,
        Some(value) => Some(value.clone()),
        None => current.cloned(),
    }
}

pub fn describe_widget(
    widget: &QuestionWidget,
    context: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Result<WidgetDescription, RuleError> {
    let evaluation = evaluate_widget(widget, context, registry)?;

    let mut choices = Vec::<Value>::new();
    for choice in &widget.choices {
        let shown = match &choice.conditional {
            Some(condition) => evaluate_condition(condition, context, registry)?,
            None => true,
        };
        if shown {
            choices.push(choice.value.clone());
        }
    }

    let default_value = match &widget.default_value {
        None => None,
        Some(ValueRule::Lit { lit }) => Some(lit.clone()),
        Some(ValueRule::Ref { ref_path }) => context.lookup(Some(ref_path))?.cloned(),
        Some(ValueRule::Registered { registered }) => registry.value(registered)?(context)?,
    };

    Ok(WidgetDescription {
        evaluation,
        choices,
        default_value,
    })
}

/// Paths whose change may alter this widget's visibility, validity or
/// correction, including the pointers read by `{…}` placeholders in the
/// widget path and rule paths. Any registered rule makes the widget depend
/// on everything.
pub fn collect_rule_dependencies(
    widget: &QuestionWidget,
    context: &RuleContext<'_>,
) -> Result<RuleDependencies, RuleError> {
    let mut collector = DependencyCollector::new(context);
    collector.add_path(None)?;
    collector.paths.extend(placeholder_paths(&widget.path));
    if let Some(custom_path) = &widget.custom_path {
        collector.paths.extend(placeholder_paths(custom_path));
    }
    if let Some(custom_path) = context.custom_path {
        collector.paths.insert(custom_path.to_string());
    }
    collector.add_conditional(widget.conditional.as_ref())?;
    for rule in &widget.validations {
        match rule {
            ValidationRule::Registered { .. } => collector.all = true,
            ValidationRule::OutsideSurveyPeriod {
                outside_survey_period,
                ..
            } => collector.add_path(outside_survey_period.path.as_deref())?,
            ValidationRule::FailsWhen { fails_when, .. } => collector.add_condition(fails_when)?,
        }
    }
    for path in &widget.depends_on {
        collector.add_path(Some(path))?;
    }
    Ok(collector.finish())
}

pub fn collect_conditional_dependencies(
    rule: Option<&ConditionalRule>,
    context: &RuleContext<'_>,
) -> Result<RuleDependencies, RuleError> {
    let mut collector = DependencyCollector::new(context);
    collector.add_conditional(rule)?;
    Ok(collector.finish())
}

struct DependencyCollector<'c, 'a> {
    context: &'c RuleContext<'a>,
    all: bool,
    paths: BTreeSet<String>,
}

impl<'c, 'a> DependencyCollector<'c, 'a> {
    fn new(context: &'c RuleContext<'a>) -> Self {
        Self {
            context,
            all: false,
            paths: BTreeSet::new(),
        }
    }

    fn add_path(&mut self, relative: Option<&str>) -> Result<(), RuleError> {
        if let Some(relative) = relative {
            self.paths.extend(placeholder_paths(relative));
        }
        if let Some(path) = self.context.resolve(relative)? {
            self.paths.insert(path);
        }
        Ok(())
    }

    fn add_conditional(&mut self, rule: Option<&ConditionalRule>) -> Result<(), RuleError> {
        match rule {
            None => Ok(()),
            Some(ConditionalRule::Registered { .. }) => {
                self.all = true;
                Ok(())
            }
            Some(ConditionalRule::Declarative { when, .. }) => self.add_condition(when),
        }
    }

    fn add_condition(&mut self, condition: &Condition) -> Result<(), RuleError> {
        match condition {
            Condition::Always | Condition::Never => Ok(()),
            Condition::IsBlank { path }
            | Condition::NotBlank { path }
            | Condition::Equals { path, .. }
            | Condition::NotEquals { path, .. }
            | Condition::OneOf { path, .. }
            | Condition::GreaterThan { path, .. }
            | Condition::LessThan { path, .. }
            | Condition::Matches { path, .. } => self.add_path(path.as_deref()),
            Condition::All { conditions } | Condition::Any { conditions } => {
                for condition in conditions {
                    self.add_condition(condition)?;
                }
                Ok(())
            }
            Condition::Not { condition } => self.add_condition(condition),
            Condition::Registered { .. } => {
                self.all = true;
                Ok(())
            }
        }
    }

    fn finish(self) -> RuleDependencies {
        if self.all {
            RuleDependencies::All
        } else {
            RuleDependencies::Paths(self.paths)
        }
    }
}

fn run_validations(
    rules: &[ValidationRule],
    value: Option<&Value>,
    custom_value: Option<&Value>,
    context: &RuleContext<'_>,
    registry: &RuleRegistry,
) -> Result<Vec<String>, RuleError> {
    let mut messages = Vec::<String>::new();
    for rule in rules {
        match rule {
            ValidationRule::FailsWhen {
                fails_when,
                message,
            } => {
                if evaluate_condition(fails_when, context, registry)? {
                    messages.push(message.clone());
                }
            }
            ValidationRule::OutsideSurveyPeriod {
                outside_survey_period,
                message,
            } => {
                let candidate = match outside_survey_period.path.as_deref() {
                    Some(path) => context.lookup(Some(path))?,
                    None => value,
                };
                let outside = candidate
                    .and_then(Value::as_str)
                    .and_then(parse_date)
                    .is_some_and(|date| !context.config.survey_period_contains(date));
                if outside {
                    messages.push(message.clone());
                }
            }
            ValidationRule::Registered {
                registered,
                message,
            } => {
                let outcomes = registry.validation(registered)?(context, value, custom_value)?;
                for outcome in outcomes.into_iter().filter(|outcome| outcome.failed) {
                    messages.push(message.clone().unwrap_or(outcome.message));
                }
            }
        }
    }
    Ok(messages)
}

fn with_corrections<'v>(
    document: &InterviewDocument,
    corrections: impl IntoIterator<Item = (&'v str, &'v Value)>,
) -> InterviewDocument {
    let mut scratch = document.clone();
    for (path, target) in corrections {
        let absolute = response_path(path);
        if target.is_null() {
            scratch.unset(&absolute);
        } else if let Err(err) = scratch.set(&absolute, target.clone()) {
            tracing::debug!(path, error = %err, "correction could not be staged for validation");
        }
    }
    scratch
}

/// `null` and absent are the same stored state.
pub fn differs_from_stored(current: Option<&Value>, target: &Value) -> bool {
    match current {
        None => !target.is_null(),
        Some(current) => !values_equal(current, target),
    }
}

pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left.as_f64() == right.as_f64(),
        _ => left == right,
    }
}

fn lookup_equals(current: Option<&Value>, expected: &Value) -> bool {
    match current {
        Some(current) => values_equal(current, expected),
        None => expected.is_null(),
    }
}

pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn as_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[path = "evaluate_test.rs"]
mod tests;
