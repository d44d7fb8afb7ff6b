mod audit;
mod segments;
mod shortcuts;

pub use audit::audit_interview;
pub use segments::{
    is_simple_chain_single_mode_return_trip, previous_trip_single_segment,
    select_next_incomplete_trip, should_show_same_as_reverse_trip_question,
};
pub use shortcuts::{
    follow_shortcut_chain, replace_visited_place_shortcuts, resolve_shortcut_chain,
    visited_place_geography, visited_place_name, ShortcutChain,
};

use odsurvey_core::{sorted_members, InterviewDocument};
use serde_json::Value;

pub const PERSONS_PATH: &str = "household.persons";
pub const ACTIVE_PERSON_ID: &str = "_activePersonId";
pub const ACTIVE_JOURNEY_ID: &str = "_activeJourneyId";
pub const ACTIVE_TRIP_ID: &str = "_activeTripId";
pub const ACTIVE_SECTION: &str = "_activeSection";
pub const LANGUAGE: &str = "_language";

pub const JOURNEYS_FIELD: &str = "journeys";
pub const VISITED_PLACES_FIELD: &str = "visitedPlaces";
pub const TRIPS_FIELD: &str = "trips";
pub const SEGMENTS_FIELD: &str = "segments";
pub const SHORTCUT_FIELD: &str = "shortcut";
pub const NAME_FIELD: &str = "name";
pub const GEOGRAPHY_FIELD: &str = "geography";
pub const ACTIVITY_FIELD: &str = "activity";
pub const ORIGIN_FIELD: &str = "originVisitedPlaceUuid";
pub const DESTINATION_FIELD: &str = "destinationVisitedPlaceUuid";

/// Read-only view of a grouped member: its key, sequence, response path and
/// raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberView<'a> {
    pub uuid: &'a str,
    pub sequence: Option<i64>,
    pub path: String,
    pub value: &'a Value,
}

impl<'a> MemberView<'a> {
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.value.get(name).filter(|value| !value.is_null())
    }

    pub fn field_str(&self, name: &str) -> Option<&'a str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn field_bool(&self, name: &str) -> Option<bool> {
        self.field(name).and_then(Value::as_bool)
    }

    fn children(&self, field: &str) -> Vec<MemberView<'a>> {
        let collection_path = format!("{}.{field}", self.path);
        sorted_members(self.value.get(field))
            .into_iter()
            .map(|member| MemberView {
                uuid: member.uuid,
                sequence: member.sequence,
                path: format!("{collection_path}.{}", member.uuid),
                value: member.value,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person<'a>(pub MemberView<'a>);

#[derive(Debug, Clone, PartialEq)]
pub struct Journey<'a>(pub MemberView<'a>);

#[derive(Debug, Clone, PartialEq)]
pub struct VisitedPlace<'a>(pub MemberView<'a>);

#[derive(Debug, Clone, PartialEq)]
pub struct Trip<'a>(pub MemberView<'a>);

#[derive(Debug, Clone, PartialEq)]
pub struct Segment<'a>(pub MemberView<'a>);

/// A place either carries its own data or points at another place.
/// A present `shortcut` wins over `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceReference<'a> {
    Direct { name: Option<&'a str> },
    Shortcut { target: &'a str },
}

impl<'a> Person<'a> {
    pub fn journeys(&self) -> Vec<Journey<'a>> {
        self.0.children(JOURNEYS_FIELD).into_iter().map(Journey).collect()
    }

    pub fn journey(&self, uuid: &str) -> Option<Journey<'a>> {
        self.journeys().into_iter().find(|journey| journey.0.uuid == uuid)
    }

    pub fn usual_work_place(&self) -> Option<&'a Value> {
        self.0.field("usualWorkPlace")
    }

    pub fn usual_school_place(&self) -> Option<&'a Value> {
        self.0.field("usualSchoolPlace")
    }
}

impl<'a> Journey<'a> {
    pub fn visited_places(&self) -> Vec<VisitedPlace<'a>> {
        self.0
            .children(VISITED_PLACES_FIELD)
            .into_iter()
            .map(VisitedPlace)
            .collect()
    }

    pub fn visited_place(&self, uuid: &str) -> Option<VisitedPlace<'a>> {
        self.visited_places()
            .into_iter()
            .find(|place| place.0.uuid == uuid)
    }

    pub fn trips(&self) -> Vec<Trip<'a>> {
        self.0.children(TRIPS_FIELD).into_iter().map(Trip).collect()
    }

    pub fn trip(&self, uuid: &str) -> Option<Trip<'a>> {
        self.trips().into_iter().find(|trip| trip.0.uuid == uuid)
    }

    /// The trip ranked just before `trip` by sequence.
    pub fn previous_trip(&self, trip: &Trip<'_>) -> Option<Trip<'a>> {
        let trips = self.trips();
        let index = trips.iter().position(|candidate| candidate.0.uuid == trip.0.uuid)?;
        index.checked_sub(1).and_then(|previous| trips.into_iter().nth(previous))
    }

    pub fn origin(&self, trip: &Trip<'_>) -> Option<VisitedPlace<'a>> {
        self.visited_place(trip.origin_uuid()?)
    }

    pub fn destination(&self, trip: &Trip<'_>) -> Option<VisitedPlace<'a>> {
        self.visited_place(trip.destination_uuid()?)
    }
}

impl<'a> VisitedPlace<'a> {
    pub fn activity(&self) -> Option<&'a str> {
        self.0.field_str(ACTIVITY_FIELD)
    }

    pub fn reference(&self) -> PlaceReference<'a> {
        match self.0.field_str(SHORTCUT_FIELD) {
            Some(target) => PlaceReference::Shortcut { target },
            None => PlaceReference::Direct {
                name: self.0.field_str(NAME_FIELD),
            },
        }
    }

    pub fn shortcut(&self) -> Option<&'a str> {
        self.0.field_str(SHORTCUT_FIELD)
    }

    /// Own geography, without following shortcuts.
    pub fn geography(&self) -> Option<&'a Value> {
        self.0.field(GEOGRAPHY_FIELD)
    }
}

impl<'a> Trip<'a> {
    pub fn origin_uuid(&self) -> Option<&'a str> {
        self.0.field_str(ORIGIN_FIELD)
    }

    pub fn destination_uuid(&self) -> Option<&'a str> {
        self.0.field_str(DESTINATION_FIELD)
    }

    pub fn segments(&self) -> Vec<Segment<'a>> {
        self.0.children(SEGMENTS_FIELD).into_iter().map(Segment).collect()
    }

    /// No segment yet, or the last one by sequence does not close the trip.
    pub fn is_incomplete(&self) -> bool {
        self.segments()
            .last()
            .map_or(true, |segment| segment.has_next_mode() != Some(false))
    }
}

impl<'a> Segment<'a> {
    pub fn is_new(&self) -> Option<bool> {
        self.0.field_bool("isNew")
    }

    pub fn mode_pre(&self) -> Option<&'a str> {
        self.0.field_str("modePre")
    }

    pub fn mode(&self) -> Option<&'a str> {
        self.0.field_str("mode")
    }

    pub fn same_mode_as_reverse_trip(&self) -> Option<bool> {
        self.0.field_bool("sameModeAsReverseTrip")
    }

    pub fn has_next_mode(&self) -> Option<bool> {
        self.0.field_bool("hasNextMode")
    }
}

pub fn persons(document: &InterviewDocument) -> Vec<Person<'_>> {
    sorted_members(document.response(PERSONS_PATH))
        .into_iter()
        .map(|member| {
            Person(MemberView {
                uuid: member.uuid,
                sequence: member.sequence,
                path: format!("{PERSONS_PATH}.{}", member.uuid),
                value: member.value,
            })
        })
        .collect()
}

pub fn person<'a>(document: &'a InterviewDocument, uuid: &str) -> Option<Person<'a>> {
    persons(document).into_iter().find(|person| person.0.uuid == uuid)
}

/// `_activePersonId`, or the only person of a one-person household.
pub fn active_person(document: &InterviewDocument) -> Option<Person<'_>> {
    let mut persons = persons(document);
    match document.response_str(ACTIVE_PERSON_ID) {
        Some(uuid) => persons.into_iter().find(|person| person.0.uuid == uuid),
        None if persons.len() == 1 => persons.pop(),
        None => None,
    }
}

pub fn active_journey<'a>(
    document: &'a InterviewDocument,
    person: &Person<'a>,
) -> Option<Journey<'a>> {
    person.journey(document.response_str(ACTIVE_JOURNEY_ID)?)
}

pub fn active_trip<'a>(document: &'a InterviewDocument, journey: &Journey<'a>) -> Option<Trip<'a>> {
    journey.trip(document.response_str(ACTIVE_TRIP_ID)?)
}

/// Every visited place of every journey, persons then journeys then places
/// in sequence order, paired with the owning person.
pub fn all_visited_places(document: &InterviewDocument) -> Vec<(Person<'_>, VisitedPlace<'_>)> {
    let mut places = Vec::new();
    for person in persons(document) {
        for journey in person.journeys() {
            for place in journey.visited_places() {
                places.push((person.clone(), place));
            }
        }
    }
    places
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
