use super::{describe_section, update_section, UpdateContext, UpdateSectionError};
use crate::engine::AffectedPaths;
use odsurvey_core::{Changeset, InterviewDocument, SurveyConfig};
use odsurvey_sdk::{
    ConditionalOutcome, Questionnaire, RuleError, RuleRegistry, ValidationOutcome,
    QUESTIONNAIRE_SCHEMA_0_0_1,
};
use serde_json::{json, Value};

fn questionnaire() -> Questionnaire {
    serde_json::from_value(json!({
        "schema": QUESTIONNAIRE_SCHEMA_0_0_1,
        "sections": {
            "household": {"widgets": ["hasCar", "carNumber", "carType"]},
            "persons": {"widgets": ["personsIntro", "persons"]},
            "loop": {"widgets": ["flipper"]},
            "broken": {"widgets": ["mystery"]},
            "license": {"widgets": ["drivingLicense"]},
            "mode": {"widgets": ["tripMode"]}
        },
        "widgets": {
            "hasCar": {
                "type": "question",
                "path": "household.hasCar",
                "validations": [
                    {"fails_when": {"op": "is_blank"}, "message": "Required"}
                ]
            },
            "carNumber": {
                "type": "question",
                "path": "household.carNumber",
                "conditional": {
                    "when": {"op": "equals", "path": "../hasCar", "value": "yes"},
                    "on_hidden": {"action": "assign", "value": 0}
                },
                "validations": [
                    {"fails_when": {"op": "is_blank"}, "message": "Required"},
                    {"fails_when": {"op": "less_than", "value": 1}, "message": "At least one car"}
                ]
            },
            "carType": {
                "type": "question",
                "path": "household.carType",
                "conditional": {
                    "when": {"op": "greater_than", "path": "../carNumber", "value": 0},
                    "on_hidden": {"action": "clear"}
                }
            },
            "personsIntro": {
                "type": "text",
                "conditional": {"when": {"op": "not_blank", "path": "household.size"}}
            },
            "persons": {
                "type": "group",
                "path": "household.persons",
                "widgets": ["personAge"]
            },
            "personAge": {
                "type": "question",
                "path": "age",
                "validations": [
                    {"fails_when": {"op": "less_than", "value": 0}, "message": "Invalid age"}
                ]
            },
            "flipper": {
                "type": "question",
                "path": "flag",
                "conditional": {"registered": "flip"}
            },
            "drivingLicense": {
                "type": "question",
                "path": "household.persons.{_activePersonId}.drivingLicense",
                "conditional": {
                    "when": {"op": "greater_than", "path": "../age", "value": 15},
                    "on_hidden": {"action": "assign", "value": "no"}
                }
            },
            "tripMode": {
                "type": "question",
                "path": "trip.mode",
                "custom_path": "trip.modeOther",
                "validations": [{"registered": "otherNeedsText"}]
            },
            "mystery": {
                "type": "question",
                "path": "mystery",
                "conditional": {"when": {"op": "registered", "name": "not_registered"}}
            }
        }
    }))
    .expect("questionnaire must parse")
}

fn registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.register_conditional("flip", |context| {
        let current = context.value().and_then(Value::as_bool).unwrap_or(false);
        Ok(ConditionalOutcome::hidden(Some(json!(!current))))
    });
    registry.register_validation("otherNeedsText", |_context, value, custom| {
        let other = value.and_then(Value::as_str) == Some("other");
        let specified = custom.and_then(Value::as_str).is_some_and(|text| !text.is_empty());
        Ok(vec![ValidationOutcome {
            failed: other && !specified,
            message: "Please specify".to_string(),
        }])
    });
    registry
}

fn car_owner() -> InterviewDocument {
    InterviewDocument::from_responses(json!({
        "household": {"hasCar": "yes", "carNumber": 2, "carType": "sedan"}
    }))
}

fn proposal(path: &str, value: Value) -> Changeset {
    let mut changeset = Changeset::new();
    changeset.set(path, value);
    changeset
}

#[test]
fn hiding_a_question_cascades_corrections() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let update = update_section(
        &context,
        "household",
        car_owner(),
        AffectedPaths::new(),
        &proposal("responses.household.hasCar", json!("no")),
    )
    .expect("update must succeed");

    assert!(update.converged);
    assert_eq!(update.iterations, 2);
    assert!(update.all_widgets_valid);
    assert!(update.issues.is_empty());
    assert_eq!(
        update.document.responses(),
        &json!({"household": {"hasCar": "no", "carNumber": 0}})
    );
    assert_eq!(
        update.applied.value("responses.household.hasCar"),
        Some(&json!("no"))
    );
    assert_eq!(
        update.applied.value("responses.household.carNumber"),
        Some(&json!(0))
    );
    assert!(update.applied.is_unset("responses.household.carType"));
    assert_eq!(update.document.validation("household.hasCar"), Some(true));

    let statuses = update
        .statuses
        .iter()
        .map(|status| (status.widget.as_str(), status.visible))
        .collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![("hasCar", true), ("carNumber", false), ("carType", false)]
    );
}

#[test]
fn converged_documents_are_left_alone() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let first = update_section(
        &context,
        "household",
        car_owner(),
        AffectedPaths::new(),
        &proposal("responses.household.hasCar", json!("no")),
    )
    .expect("first update");

    let quiet = update_section(
        &context,
        "household",
        first.document.clone(),
        AffectedPaths::new(),
        &Changeset::new(),
    )
    .expect("quiet update");
    assert!(quiet.applied.is_empty());
    assert!(quiet.statuses.is_empty());
    assert_eq!(quiet.iterations, 1);
    assert_eq!(quiet.document, first.document);

    let everything = update_section(
        &context,
        "household",
        first.document.clone(),
        AffectedPaths::everything(),
        &Changeset::new(),
    )
    .expect("full update");
    assert!(everything.applied.is_empty());
    assert_eq!(everything.statuses.len(), 3);
    assert_eq!(everything.document, first.document);
}

#[test]
fn touched_questions_report_failures() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let update = update_section(
        &context,
        "household",
        car_owner(),
        AffectedPaths::new(),
        &proposal("responses.household.carNumber", json!(0)),
    )
    .expect("update must succeed");

    assert!(!update.all_widgets_valid);
    assert_eq!(update.document.validation("household.carNumber"), Some(false));
    assert_eq!(
        update.applied.value("validations.household.carNumber"),
        Some(&json!(false))
    );
    let status = update
        .statuses
        .iter()
        .find(|status| status.widget == "carNumber")
        .expect("carNumber evaluated");
    assert_eq!(status.messages, vec!["At least one car".to_string()]);
}

#[test]
fn untouched_questions_stay_valid_until_answered() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let document = InterviewDocument::from_responses(json!({"household": {"hasCar": "no"}}));
    let update = update_section(
        &context,
        "household",
        document,
        AffectedPaths::new(),
        &proposal("responses.household.hasCar", json!("yes")),
    )
    .expect("update must succeed");

    let status = update
        .statuses
        .iter()
        .find(|status| status.widget == "carNumber")
        .expect("carNumber evaluated");
    assert!(status.visible);
    assert!(status.valid);
    assert!(status.messages.is_empty());
    assert_eq!(update.document.validation("household.carNumber"), Some(true));
    assert!(update.all_widgets_valid);
}

#[test]
fn iteration_cap_is_reported() {
    let questionnaire = questionnaire();
    let registry = registry();
    let mut config = SurveyConfig::default();
    config.engine.max_update_iterations = 3;
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let update = update_section(
        &context,
        "loop",
        InterviewDocument::new(),
        AffectedPaths::new(),
        &proposal("responses.flag", json!(true)),
    )
    .expect("soft cap must not fail");
    assert!(!update.converged);
    assert_eq!(update.iterations, 3);
    assert_eq!(update.issues.len(), 1);
    assert_eq!(update.issues[0].kind, "convergence");
    assert_eq!(
        update.issues[0].related,
        Some(json!({"pending_paths": ["flag"]}))
    );

    config.engine.strict_convergence = true;
    let context = UpdateContext::new(&questionnaire, &registry, &config);
    let err = update_section(
        &context,
        "loop",
        InterviewDocument::new(),
        AffectedPaths::new(),
        &proposal("responses.flag", json!(true)),
    )
    .expect_err("strict cap must fail");
    assert!(matches!(
        err,
        UpdateSectionError::DidNotConverge { iterations: 3, .. }
    ));
}

#[test]
fn unknown_sections_and_rules_are_errors() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let err = update_section(
        &context,
        "nowhere",
        InterviewDocument::new(),
        AffectedPaths::everything(),
        &Changeset::new(),
    )
    .expect_err("unknown section");
    assert!(matches!(err, UpdateSectionError::UnknownSection(name) if name == "nowhere"));

    let err = update_section(
        &context,
        "broken",
        InterviewDocument::new(),
        AffectedPaths::everything(),
        &Changeset::new(),
    )
    .expect_err("unknown rule");
    match err {
        UpdateSectionError::Rule { widget, source, .. } => {
            assert_eq!(widget, "mystery");
            assert_eq!(
                source,
                RuleError::UnknownRule {
                    kind: "condition",
                    name: "not_registered".to_string()
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejected_proposals_are_reported_not_applied() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let mut proposed = proposal("responses.household.hasCar", json!("yes"));
    proposed.set("sectionLoaded", json!("household"));
    let update = update_section(
        &context,
        "household",
        car_owner(),
        AffectedPaths::new(),
        &proposed,
    )
    .expect("update must succeed");

    assert_eq!(update.issues.len(), 1);
    assert_eq!(update.issues[0].kind, "changeset_rejected");
    assert!(update.applied.get("sectionLoaded").is_none());
    assert!(update.document.get("sectionLoaded").is_none());
}

#[test]
fn group_members_are_evaluated_and_described() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let document = InterviewDocument::from_responses(json!({
        "household": {"persons": {
            "p2": {"uuid": "p2", "sequence": 2, "age": 40},
            "p1": {"uuid": "p1", "sequence": 1, "age": 12}
        }}
    }));
    let update = update_section(
        &context,
        "persons",
        document,
        AffectedPaths::new(),
        &proposal("responses.household.persons.p2.age", json!(-4)),
    )
    .expect("update must succeed");

    let statuses = update
        .statuses
        .iter()
        .map(|status| (status.path.as_str(), status.valid))
        .collect::<Vec<_>>();
    assert_eq!(statuses, vec![("household.persons.p2.age", false)]);
    assert_eq!(
        update.statuses[0].group_path.as_deref(),
        Some("household.persons.p2")
    );

    let described = describe_section(&context, "persons", &update.document)
        .expect("describe must succeed");
    let summary = described
        .iter()
        .map(|widget| (widget.widget.as_str(), widget.path.as_str(), widget.visible))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("personsIntro", "personsIntro", false),
            ("persons", "household.persons", true),
            ("personAge", "household.persons.p1.age", true),
            ("personAge", "household.persons.p2.age", true),
        ]
    );
    let p2 = described[3].question.as_ref().expect("question description");
    assert_eq!(p2.evaluation.messages, vec!["Invalid age".to_string()]);
}

#[test]
fn switching_the_active_person_reevaluates_pointed_widgets() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let document = InterviewDocument::from_responses(json!({
        "_activePersonId": "p1",
        "household": {"persons": {
            "p1": {"uuid": "p1", "sequence": 1, "age": 40, "drivingLicense": "yes"},
            "p2": {"uuid": "p2", "sequence": 2, "age": 8, "drivingLicense": "yes"}
        }}
    }));
    let update = update_section(
        &context,
        "license",
        document,
        AffectedPaths::new(),
        &proposal("responses._activePersonId", json!("p2")),
    )
    .expect("update must succeed");

    assert!(update.converged);
    assert_eq!(
        update
            .statuses
            .iter()
            .map(|status| (status.path.as_str(), status.visible))
            .collect::<Vec<_>>(),
        vec![("household.persons.p2.drivingLicense", false)]
    );
    assert_eq!(
        update.document.response("household.persons.p2.drivingLicense"),
        Some(&json!("no"))
    );
    assert_eq!(
        update.document.response("household.persons.p1.drivingLicense"),
        Some(&json!("yes"))
    );
    assert_eq!(
        update
            .applied
            .value("responses.household.persons.p2.drivingLicense"),
        Some(&json!("no"))
    );
}

#[test]
fn custom_answers_share_the_widget_validity() {
    let questionnaire = questionnaire();
    let registry = registry();
    let config = SurveyConfig::default();
    let context = UpdateContext::new(&questionnaire, &registry, &config);

    let update = update_section(
        &context,
        "mode",
        InterviewDocument::new(),
        AffectedPaths::new(),
        &proposal("responses.trip.mode", json!("other")),
    )
    .expect("update must succeed");
    assert_eq!(update.statuses.len(), 1);
    assert_eq!(update.statuses[0].custom_path.as_deref(), Some("trip.modeOther"));
    assert!(!update.statuses[0].valid);
    assert_eq!(update.statuses[0].messages, vec!["Please specify".to_string()]);
    assert_eq!(update.document.validation("trip.mode"), Some(false));
    assert_eq!(update.document.validation("trip.modeOther"), Some(false));
    assert_eq!(update.applied.value("validations.trip.modeOther"), Some(&json!(false)));

    let update = update_section(
        &context,
        "mode",
        update.document,
        AffectedPaths::new(),
        &proposal("responses.trip.modeOther", json!("kick scooter")),
    )
    .expect("update must succeed");
    assert_eq!(update.statuses.len(), 1);
    assert!(update.statuses[0].valid);
    assert_eq!(update.statuses[0].custom_value, Some(json!("kick scooter")));
    assert_eq!(update.document.validation("trip.mode"), Some(true));
    assert_eq!(update.document.validation("trip.modeOther"), Some(true));
    assert!(update.all_widgets_valid);
}
