use super::audit_interview;
use odsurvey_core::{InterviewDocument, IssueSeverity};
use serde_json::{json, Value};

fn journey_document(journey: Value) -> InterviewDocument {
    InterviewDocument::from_responses(json!({
        "household": {"persons": {"p1": {
            "uuid": "p1",
            "sequence": 1,
            "journeys": {"j1": journey}
        }}}
    }))
}

fn sound_journey() -> Value {
    json!({
        "uuid": "j1",
        "sequence": 1,
        "visitedPlaces": {
            "a": {"uuid": "a", "sequence": 1, "activity": "home"},
            "b": {"uuid": "b", "sequence": 2, "activity": "work", "name": "Office"},
            "c": {
                "uuid": "c",
                "sequence": 3,
                "activity": "work",
                "shortcut": "household.persons.p1.journeys.j1.visitedPlaces.b"
            }
        },
        "trips": {
            "t1": {
                "uuid": "t1",
                "sequence": 1,
                "originVisitedPlaceUuid": "a",
                "destinationVisitedPlaceUuid": "b",
                "segments": {"s1": {"uuid": "s1", "sequence": 1, "mode": "walk"}}
            },
            "t2": {
                "uuid": "t2",
                "sequence": 2,
                "originVisitedPlaceUuid": "b",
                "destinationVisitedPlaceUuid": "c"
            }
        }
    })
}

fn references(document: &InterviewDocument) -> Vec<String> {
    audit_interview(document)
        .into_iter()
        .filter_map(|issue| issue.reference)
        .collect()
}

#[test]
fn sound_tree_has_no_issues() {
    let document = journey_document(sound_journey());
    assert!(audit_interview(&document).is_empty());
}

#[test]
fn empty_document_has_no_issues() {
    assert!(audit_interview(&InterviewDocument::new()).is_empty());
}

#[test]
fn gaps_in_sequences_are_reported() {
    let mut journey = sound_journey();
    journey["trips"]["t1"]["segments"]["s2"] = json!({"uuid": "s2", "sequence": 3});
    let document = journey_document(journey);

    let issues = audit_interview(&document);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, IssueSeverity::Error);
    assert_eq!(
        issues[0].path,
        "household.persons.p1.journeys.j1.trips.t1.segments"
    );
    assert_eq!(
        issues[0].reference.as_deref(),
        Some("audit.sequence.non_contiguous")
    );
    assert_eq!(issues[0].related, Some(json!({"sequences": [1, 3]})));
}

#[test]
fn shortcut_with_name_is_a_warning() {
    let mut journey = sound_journey();
    journey["visitedPlaces"]["c"]["name"] = json!("Office again");
    let document = journey_document(journey);

    let issues = audit_interview(&document);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, IssueSeverity::Warning);
    assert_eq!(
        issues[0].reference.as_deref(),
        Some("audit.place.shortcut_with_name")
    );
}

#[test]
fn broken_shortcut_chains_are_errors() {
    let mut journey = sound_journey();
    journey["visitedPlaces"]["b"]["shortcut"] =
        json!("household.persons.p1.journeys.j1.visitedPlaces.c");
    journey["visitedPlaces"]["b"]
        .as_object_mut()
        .expect("place object")
        .remove("name");
    let document = journey_document(journey);
    let found = references(&document);
    assert_eq!(
        found,
        vec!["audit.place.shortcut_cycle", "audit.place.shortcut_cycle"]
    );

    let mut journey = sound_journey();
    journey["visitedPlaces"]["c"]["shortcut"] = json!("responses.home.place");
    let document = journey_document(journey);
    let issues = audit_interview(&document);
    assert_eq!(issues.len(), 1);
    assert_eq!(
        issues[0].reference.as_deref(),
        Some("audit.place.shortcut_dangling")
    );
    assert_eq!(issues[0].related, Some(json!({"target": "home.place"})));
}

#[test]
fn trip_chain_mismatches_are_reported() {
    let mut journey = sound_journey();
    journey["trips"]
        .as_object_mut()
        .expect("trips object")
        .remove("t2");
    journey["trips"]["t1"]["destinationVisitedPlaceUuid"] = json!("c");
    let document = journey_document(journey);

    let found = references(&document);
    assert_eq!(
        found,
        vec!["audit.trips.count_mismatch", "audit.trips.endpoint_mismatch"]
    );
    let issues = audit_interview(&document);
    assert_eq!(
        issues[0].related,
        Some(json!({"expected": 2, "actual": 1}))
    );
    assert_eq!(issues[1].path, "household.persons.p1.journeys.j1.trips.t1");
}
