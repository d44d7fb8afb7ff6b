pub mod od;
pub mod parse;
pub mod questionnaire;
pub mod rules;

pub use od::{
    active_journey, active_person, active_trip, all_visited_places, audit_interview,
    follow_shortcut_chain, is_simple_chain_single_mode_return_trip, person, persons,
    previous_trip_single_segment, replace_visited_place_shortcuts, resolve_shortcut_chain,
    select_next_incomplete_trip, should_show_same_as_reverse_trip_question,
    visited_place_geography, visited_place_name, Journey, MemberView, Person, PlaceReference,
    Segment, ShortcutChain, Trip, VisitedPlace,
};
pub use parse::{
    parse_questionnaire, parse_questionnaire_with_format, validate_questionnaire_references,
    DocumentFormat,
};
pub use questionnaire::{
    GroupWidget, QuestionWidget, Questionnaire, SectionConfig, TextWidget, WidgetConfig,
    WidgetInstance, QUESTIONNAIRE_SCHEMA_0_0_1,
};
pub use rules::{
    collect_conditional_dependencies, collect_rule_dependencies, describe_widget,
    evaluate_condition, evaluate_conditional, evaluate_widget, ChoiceConfig, Condition,
    ConditionalOutcome, ConditionalRule, HiddenValue, RuleContext, RuleDependencies, RuleError,
    RuleRegistry, ValidationOutcome, ValidationRule, ValueRule, WidgetDescription,
    WidgetEvaluation,
};
