use super::{Questionnaire, WidgetConfig, QUESTIONNAIRE_SCHEMA_0_0_1};
use odsurvey_core::InterviewDocument;
use serde_json::json;

fn questionnaire() -> Questionnaire {
    serde_json::from_value(json!({
        "schema": QUESTIONNAIRE_SCHEMA_0_0_1,
        "sections": {
            "visitedPlaces": {
                "widgets": ["placesIntro", "visitedPlaces", "missingWidget"],
                "previous_section": "home"
            }
        },
        "widgets": {
            "placesIntro": {"type": "text"},
            "visitedPlaces": {
                "type": "group",
                "path": "household.persons.{_activePersonId}.journeys.{_activeJourneyId}.visitedPlaces",
                "widgets": ["placeActivity", "placeName"]
            },
            "placeActivity": {"type": "question", "path": "activity"},
            "placeName": {
                "type": "question",
                "path": "name",
                "conditional": {"when": {"op": "not_equals", "path": "../activity", "value": "home"}}
            }
        }
    }))
    .expect("questionnaire must parse")
}

#[test]
fn group_children_expand_per_member_in_sequence_order() {
    let questionnaire = questionnaire();
    let document = InterviewDocument::from_responses(json!({
        "_activePersonId": "p1",
        "_activeJourneyId": "j1",
        "household": {"persons": {"p1": {"journeys": {"j1": {"visitedPlaces": {
            "second": {"uuid": "second", "sequence": 2},
            "first": {"uuid": "first", "sequence": 1}
        }}}}}}
    }));

    let section = questionnaire
        .section("visitedPlaces")
        .expect("section must exist");
    let paths = questionnaire
        .section_instances(section, &document)
        .into_iter()
        .map(|instance| (instance.name, instance.path))
        .collect::<Vec<_>>();

    let places = "household.persons.p1.journeys.j1.visitedPlaces";
    assert_eq!(
        paths,
        vec![
            ("placesIntro", "placesIntro".to_string()),
            ("visitedPlaces", places.to_string()),
            ("placeActivity", format!("{places}.first.activity")),
            ("placeName", format!("{places}.first.name")),
            ("placeActivity", format!("{places}.second.activity")),
            ("placeName", format!("{places}.second.name")),
        ]
    );
}

#[test]
fn unresolved_placeholders_yield_an_empty_group() {
    let questionnaire = questionnaire();
    let section = questionnaire
        .section("visitedPlaces")
        .expect("section must exist");
    let instances = questionnaire.section_instances(section, &InterviewDocument::new());

    assert_eq!(instances.len(), 2);
    assert_eq!(
        instances[1].path,
        "household.persons.unknown.journeys.unknown.visitedPlaces"
    );
    assert!(matches!(instances[1].widget, WidgetConfig::Group(_)));
}

#[test]
fn group_children_inherit_placeholder_sources() {
    let questionnaire = questionnaire();
    let document = InterviewDocument::from_responses(json!({
        "_activePersonId": "p1",
        "_activeJourneyId": "j1",
        "household": {"persons": {"p1": {"journeys": {"j1": {"visitedPlaces": {
            "only": {"uuid": "only", "sequence": 1}
        }}}}}}
    }));
    let section = questionnaire
        .section("visitedPlaces")
        .expect("section must exist");
    let instances = questionnaire.section_instances(section, &document);

    let pointers = vec!["_activePersonId".to_string(), "_activeJourneyId".to_string()];
    assert!(instances[0].placeholder_sources.is_empty());
    assert_eq!(instances[1].placeholder_sources, pointers);
    assert_eq!(instances[2].name, "placeActivity");
    assert_eq!(instances[2].placeholder_sources, pointers);
}
