use super::{
    active_journey, active_person, active_trip, all_visited_places, person, persons,
    PlaceReference,
};
use odsurvey_core::InterviewDocument;
use serde_json::json;

fn two_person_household() -> InterviewDocument {
    InterviewDocument::from_responses(json!({
        "_activePersonId": "p2",
        "_activeJourneyId": "j2",
        "_activeTripId": "t2",
        "household": {"persons": {
            "p1": {
                "uuid": "p1",
                "sequence": 1,
                "journeys": {"j1": {"uuid": "j1", "sequence": 1, "visitedPlaces": {
                    "x": {"uuid": "x", "sequence": 1, "activity": "home"}
                }}}
            },
            "p2": {
                "uuid": "p2",
                "sequence": 2,
                "usualWorkPlace": {"geometry": {"coordinates": [-73.5, 45.5]}},
                "journeys": {"j2": {
                    "uuid": "j2",
                    "sequence": 1,
                    "visitedPlaces": {
                        "b": {"uuid": "b", "sequence": 2, "shortcut": "somewhere", "name": "Lab"},
                        "a": {"uuid": "a", "sequence": 1, "activity": "home", "name": "Home"}
                    },
                    "trips": {
                        "t2": {
                            "uuid": "t2",
                            "sequence": 2,
                            "segments": {
                                "s1": {"uuid": "s1", "sequence": 1, "hasNextMode": false}
                            }
                        },
                        "t1": {
                            "uuid": "t1",
                            "sequence": 1,
                            "originVisitedPlaceUuid": "a",
                            "destinationVisitedPlaceUuid": "b",
                            "segments": {
                                "s1": {"uuid": "s1", "sequence": 1, "hasNextMode": true}
                            }
                        }
                    }
                }}
            }
        }}
    }))
}

#[test]
fn persons_follow_sequence_and_carry_paths() {
    let document = two_person_household();
    let persons = persons(&document);
    assert_eq!(
        persons.iter().map(|person| person.0.uuid).collect::<Vec<_>>(),
        vec!["p1", "p2"]
    );
    assert_eq!(persons[1].0.path, "household.persons.p2");
    assert!(persons[1].usual_work_place().is_some());
    assert!(persons[0].usual_school_place().is_none());
    assert!(person(&document, "missing").is_none());
}

#[test]
fn person_lookup_outlives_the_requested_uuid() {
    let document = two_person_household();
    let found = {
        let uuid = format!("p{}", 1);
        person(&document, &uuid)
    };
    let found = found.expect("person p1");
    assert_eq!(found.0.path, "household.persons.p1");
    assert_eq!(found.0.sequence, Some(1));
}

#[test]
fn active_chain_resolves_from_ids() {
    let document = two_person_household();
    let person = active_person(&document).expect("active person");
    assert_eq!(person.0.uuid, "p2");
    let journey = active_journey(&document, &person).expect("active journey");
    assert_eq!(journey.0.path, "household.persons.p2.journeys.j2");
    let trip = active_trip(&document, &journey).expect("active trip");
    assert_eq!(trip.0.uuid, "t2");

    let previous = journey.previous_trip(&trip).expect("previous trip");
    assert_eq!(previous.0.uuid, "t1");
    assert!(journey.previous_trip(&previous).is_none());
    assert_eq!(journey.origin(&previous).map(|place| place.0.uuid), Some("a"));
    assert_eq!(
        journey.destination(&previous).map(|place| place.0.uuid),
        Some("b")
    );
    assert!(journey.origin(&trip).is_none());
}

#[test]
fn single_person_is_active_by_default() {
    let document = InterviewDocument::from_responses(json!({
        "household": {"persons": {"only": {"uuid": "only", "sequence": 1}}}
    }));
    assert_eq!(active_person(&document).map(|person| person.0.uuid), Some("only"));

    let mut document = two_person_household();
    document.unset("responses._activePersonId");
    assert!(active_person(&document).is_none());
}

#[test]
fn shortcut_wins_over_name() {
    let document = two_person_household();
    let person = active_person(&document).expect("active person");
    let journey = active_journey(&document, &person).expect("active journey");
    let places = journey.visited_places();
    assert_eq!(places[0].reference(), PlaceReference::Direct { name: Some("Home") });
    assert_eq!(
        places[1].reference(),
        PlaceReference::Shortcut { target: "somewhere" }
    );
}

#[test]
fn trip_completion_follows_last_segment() {
    let document = two_person_household();
    let person = active_person(&document).expect("active person");
    let journey = active_journey(&document, &person).expect("active journey");
    let trips = journey.trips();
    assert!(trips[0].is_incomplete());
    assert!(!trips[1].is_incomplete());

    let document = InterviewDocument::from_responses(json!({
        "trip": {"uuid": "t", "sequence": 1}
    }));
    let bare = super::Trip(super::MemberView {
        uuid: "t",
        sequence: Some(1),
        path: "trip".to_string(),
        value: document.response("trip").expect("trip value"),
    });
    assert!(bare.is_incomplete());
}

#[test]
fn all_places_walk_persons_then_journeys_then_places() {
    let document = two_person_household();
    let order = all_visited_places(&document)
        .into_iter()
        .map(|(person, place)| (person.0.uuid, place.0.uuid))
        .collect::<Vec<_>>();
    assert_eq!(order, vec![("p1", "x"), ("p2", "a"), ("p2", "b")]);
}
