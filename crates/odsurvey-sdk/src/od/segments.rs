use crate::od::{
    active_journey, active_person, active_trip, visited_place_geography, Journey, Person, Segment,
    Trip,
};
use odsurvey_core::{InterviewDocument, SurveyConfig};
use serde_json::Value;

/// First trip by sequence whose segments are not closed.
pub fn select_next_incomplete_trip<'a>(journey: &Journey<'a>) -> Option<Trip<'a>> {
    journey.trips().into_iter().find(Trip::is_incomplete)
}

/// The single segment of the trip before the active trip, if it has exactly one.
pub fn previous_trip_single_segment(document: &InterviewDocument) -> Option<Segment<'_>> {
    let person = active_person(document)?;
    let journey = active_journey(document, &person)?;
    let trip = active_trip(document, &journey)?;
    let previous_trip = journey.previous_trip(&trip)?;
    let mut segments = previous_trip.segments();
    if segments.len() == 1 {
        segments.pop()
    } else {
        None
    }
}

/// Whether `trip` returns to where `previous_trip` started using a single
/// simple mode, so its mode can be copied from the previous trip.
pub fn is_simple_chain_single_mode_return_trip(
    document: &InterviewDocument,
    config: &SurveyConfig,
    person: &Person<'_>,
    journey: &Journey<'_>,
    trip: &Trip<'_>,
    previous_trip: &Trip<'_>,
) -> bool {
    let (Some(origin), Some(destination), Some(previous_origin)) = (
        journey.origin(trip),
        journey.destination(trip),
        journey.origin(previous_trip),
    ) else {
        return false;
    };

    let is_loop = |activity: Option<&str>| {
        activity.is_some_and(|activity| config.is_loop_activity(activity))
    };
    if is_loop(origin.activity()) || is_loop(destination.activity()) {
        return false;
    }
    if trip.segments().len() > 1 {
        return false;
    }

    let previous_origin_geography =
        visited_place_geography(document, &previous_origin, Some(person));
    let destination_geography = visited_place_geography(document, &destination, Some(person));
    if !same_coordinates(previous_origin_geography, destination_geography) {
        return false;
    }

    let previous_segments = previous_trip.segments();
    previous_segments.len() == 1
        && previous_segments[0]
            .mode()
            .is_some_and(|mode| config.is_simple_mode(mode))
}

pub fn should_show_same_as_reverse_trip_question(
    document: &InterviewDocument,
    config: &SurveyConfig,
    segment: &Segment<'_>,
) -> bool {
    if segment.is_new() == Some(false) {
        return false;
    }
    let Some(person) = active_person(document) else {
        return false;
    };
    let Some(journey) = active_journey(document, &person) else {
        return false;
    };
    let Some(trip) = active_trip(document, &journey) else {
        return false;
    };
    let Some(previous_trip) = journey.previous_trip(&trip) else {
        return false;
    };
    is_simple_chain_single_mode_return_trip(
        document,
        config,
        &person,
        &journey,
        &trip,
        &previous_trip,
    )
}

fn same_coordinates(left: Option<&Value>, right: Option<&Value>) -> bool {
    let coordinates = |geography: Option<&Value>| {
        geography?
            .get("geometry")?
            .get("coordinates")?
            .as_array()
            .map(|items| items.iter().map(Value::as_f64).collect::<Vec<_>>())
    };
    match (coordinates(left), coordinates(right)) {
        (Some(left), Some(right)) => !left.is_empty() && left == right,
        _ => false,
    }
}

#[cfg(test)]
#[path = "segments_test.rs"]
mod tests;
