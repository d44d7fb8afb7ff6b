use odsurvey_core::{
    add_grouped_objects, apply_changeset, member_sequence, remove_grouped_objects, response_path,
    Changeset, ChangesetGuardPolicy, InterviewDocument,
};
use odsurvey_sdk::od::{
    person, select_next_incomplete_trip, ACTIVE_TRIP_ID, DESTINATION_FIELD, ORIGIN_FIELD,
    SEGMENTS_FIELD, TRIPS_FIELD,
};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct TripDerivation {
    /// Trip creations, corrections and removals, plus `_activeTripId`.
    pub changeset: Changeset,
    /// First corrected trip, else the first trip still missing segments,
    /// else the earliest created trip.
    pub focus_trip: Option<String>,
}

/// Brings the trips of a journey in line with its visited places: trip `i`
/// goes from place `i` to place `i + 1`. Missing trips are created,
/// mismatched ones get new endpoints and lose their segments, extra ones are
/// removed. Returns `None` when the person or journey does not exist.
pub fn derive_journey_trips(
    document: &InterviewDocument,
    person_uuid: &str,
    journey_uuid: &str,
) -> Option<TripDerivation> {
    let journey = person(document, person_uuid)?.journey(journey_uuid)?;
    let places = journey.visited_places();
    let trips = journey.trips();
    let trips_path = format!("{}.{TRIPS_FIELD}", journey.0.path);
    let expected = places.len().saturating_sub(1);

    let mut changeset = Changeset::new();
    let mut first_invalid = None::<String>;
    let mut missing = Vec::<Map<String, Value>>::new();

    for (slot, pair) in places.windows(2).enumerate() {
        let (origin, destination) = (pair[0].0.uuid, pair[1].0.uuid);
        let Some(trip) = trips.get(slot) else {
            missing.push(Map::from_iter([
                (ORIGIN_FIELD.to_string(), json!(origin)),
                (DESTINATION_FIELD.to_string(), json!(destination)),
            ]));
            continue;
        };
        if trip.origin_uuid() == Some(origin) && trip.destination_uuid() == Some(destination) {
            continue;
        }
        let trip_field = |field: &str| response_path(&format!("{}.{field}", trip.0.path));
        changeset
            .set(trip_field(ORIGIN_FIELD), json!(origin))
            .set(trip_field(DESTINATION_FIELD), json!(destination))
            .set_undefined(trip_field(SEGMENTS_FIELD));
        first_invalid.get_or_insert_with(|| trip.0.uuid.to_string());
    }

    let mut new_trip = None;
    if !missing.is_empty() {
        let created = add_grouped_objects(
            document,
            missing.len(),
            Some(trips.len() as i64 + 1),
            &trips_path,
            &missing,
        );
        new_trip = first_created_trip(&created, &trips_path);
        changeset.merge(created);
    }

    let excess = trips
        .iter()
        .skip(expected)
        .map(|trip| trip.0.path.clone())
        .collect::<Vec<_>>();
    if !excess.is_empty() {
        changeset.merge(remove_grouped_objects(document, &excess));
    }

    let focus_trip = first_invalid
        .or_else(|| next_incomplete_after(document, &changeset, person_uuid, journey_uuid))
        .or(new_trip);
    changeset.set(
        response_path(ACTIVE_TRIP_ID),
        focus_trip.clone().map_or(Value::Null, Value::String),
    );

    tracing::debug!(
        journey = journey.0.path.as_str(),
        places = places.len(),
        trips = trips.len(),
        created = missing.len(),
        removed = excess.len(),
        focus = ?focus_trip,
        "journey trips derived"
    );
    Some(TripDerivation {
        changeset,
        focus_trip,
    })
}

/// Lowest-sequence member among the trips `created` adds.
fn first_created_trip(created: &Changeset, trips_path: &str) -> Option<String> {
    let prefix = response_path(&format!("{trips_path}."));
    created
        .values_by_path()
        .iter()
        .filter_map(|(path, value)| {
            let uuid = path.strip_prefix(&prefix)?;
            if uuid.contains('.') {
                return None;
            }
            Some((member_sequence(value.as_ref()?)?, uuid.to_string()))
        })
        .min()
        .map(|(_, uuid)| uuid)
}

fn next_incomplete_after(
    document: &InterviewDocument,
    changeset: &Changeset,
    person_uuid: &str,
    journey_uuid: &str,
) -> Option<String> {
    let mut scratch = document.clone();
    apply_changeset(&mut scratch, changeset, &ChangesetGuardPolicy::default());
    let journey = person(&scratch, person_uuid)?.journey(journey_uuid)?;
    let trip = select_next_incomplete_trip(&journey)?;
    Some(trip.0.uuid.to_string())
}

#[cfg(test)]
#[path = "derive_test.rs"]
mod tests;
