use crate::od::{
    follow_shortcut_chain, persons, Journey, MemberView, ShortcutChain, JOURNEYS_FIELD,
    PERSONS_PATH, SEGMENTS_FIELD, TRIPS_FIELD, VISITED_PLACES_FIELD,
};
use odsurvey_core::{sorted_members, InterviewDocument, IssueSeverity, StructuredIssue};
use serde_json::{json, Value};

const AUDIT_KIND: &str = "interview_audit";

/// Checks the structural invariants of the household tree and reports every
/// violation. Never mutates the document; an empty list means a sound tree.
pub fn audit_interview(document: &InterviewDocument) -> Vec<StructuredIssue> {
    let mut issues = Vec::<StructuredIssue>::new();
    check_sequences(document.response(PERSONS_PATH), PERSONS_PATH, &mut issues);

    for person in persons(document) {
        check_child_sequences(&person.0, JOURNEYS_FIELD, &mut issues);
        for journey in person.journeys() {
            check_child_sequences(&journey.0, VISITED_PLACES_FIELD, &mut issues);
            check_child_sequences(&journey.0, TRIPS_FIELD, &mut issues);
            for trip in journey.trips() {
                check_child_sequences(&trip.0, SEGMENTS_FIELD, &mut issues);
            }
            check_places(document, &journey, &mut issues);
            check_trip_chain(&journey, &mut issues);
        }
    }

    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn check_child_sequences(owner: &MemberView<'_>, field: &str, issues: &mut Vec<StructuredIssue>) {
    let path = format!("{}.{field}", owner.path);
    check_sequences(owner.value.get(field), &path, issues);
}

fn check_sequences(collection: Option<&Value>, path: &str, issues: &mut Vec<StructuredIssue>) {
    let actual = sorted_members(collection)
        .iter()
        .map(|member| member.sequence)
        .collect::<Vec<_>>();
    let contiguous = actual
        .iter()
        .enumerate()
        .all(|(index, sequence)| *sequence == Some(index as i64 + 1));
    if contiguous {
        return;
    }
    issues.push(
        audit_issue(
            IssueSeverity::Error,
            path,
            format!("sequences of `{path}` are not contiguous from 1"),
            "audit.sequence.non_contiguous",
        )
        .with_related(json!({ "sequences": actual })),
    );
}

fn check_places(
    document: &InterviewDocument,
    journey: &Journey<'_>,
    issues: &mut Vec<StructuredIssue>,
) {
    for place in journey.visited_places() {
        let Some(shortcut) = place.shortcut() else {
            continue;
        };
        if place.0.field_str("name").is_some() {
            issues.push(audit_issue(
                IssueSeverity::Warning,
                &place.0.path,
                "visited place has both a shortcut and a name; the shortcut wins".to_string(),
                "audit.place.shortcut_with_name",
            ));
        }
        match follow_shortcut_chain(document, &place.0.path) {
            ShortcutChain::Concrete(_) => {}
            ShortcutChain::Cycle(chain) => issues.push(
                audit_issue(
                    IssueSeverity::Error,
                    &place.0.path,
                    "visited place shortcut chain is cyclic".to_string(),
                    "audit.place.shortcut_cycle",
                )
                .with_related(json!({ "chain": chain })),
            ),
            ShortcutChain::Dangling(target) => issues.push(
                audit_issue(
                    IssueSeverity::Error,
                    &place.0.path,
                    format!("visited place shortcut `{shortcut}` leads to missing place `{target}`"),
                    "audit.place.shortcut_dangling",
                )
                .with_related(json!({ "target": target })),
            ),
        }
    }
}

fn check_trip_chain(journey: &Journey<'_>, issues: &mut Vec<StructuredIssue>) {
    let places = journey.visited_places();
    let trips = journey.trips();
    let expected = places.len().saturating_sub(1);
    if trips.len() != expected {
        issues.push(
            audit_issue(
                IssueSeverity::Warning,
                &format!("{}.{TRIPS_FIELD}", journey.0.path),
                format!(
                    "journey has {} trips for {} visited places",
                    trips.len(),
                    places.len()
                ),
                "audit.trips.count_mismatch",
            )
            .with_related(json!({ "expected": expected, "actual": trips.len() })),
        );
    }

    for (trip, pair) in trips.iter().zip(places.windows(2)) {
        let expected_origin = pair[0].0.uuid;
        let expected_destination = pair[1].0.uuid;
        if trip.origin_uuid() == Some(expected_origin)
            && trip.destination_uuid() == Some(expected_destination)
        {
            continue;
        }
        issues.push(
            audit_issue(
                IssueSeverity::Warning,
                &trip.0.path,
                "trip does not connect consecutive visited places".to_string(),
                "audit.trips.endpoint_mismatch",
            )
            .with_related(json!({
                "expectedOrigin": expected_origin,
                "expectedDestination": expected_destination,
                "origin": trip.origin_uuid(),
                "destination": trip.destination_uuid(),
            })),
        );
    }
}

fn audit_issue(
    severity: IssueSeverity,
    path: &str,
    message: String,
    reference: &str,
) -> StructuredIssue {
    StructuredIssue::new(AUDIT_KIND, severity, path, message).with_reference(reference)
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
