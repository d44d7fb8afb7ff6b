mod context;
mod descriptors;
mod evaluate;
mod registry;

pub use context::RuleContext;
pub use descriptors::{
    ChoiceConfig, Condition, ConditionalRule, HiddenValue, SurveyPeriodCheck, ValidationRule,
    ValueRule,
};
pub use evaluate::{
    collect_conditional_dependencies, collect_rule_dependencies, describe_widget,
    differs_from_stored, evaluate_condition, evaluate_conditional, evaluate_widget, is_blank,
    values_equal, RuleDependencies, WidgetDescription, WidgetEvaluation,
};
pub use registry::{
    ConditionFn, ConditionalFn, ConditionalOutcome, RuleError, RuleRegistry, ValidationFn,
    ValidationOutcome, ValueFn,
};
