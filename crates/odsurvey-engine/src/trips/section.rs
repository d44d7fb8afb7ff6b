use crate::engine::{
    update_section, AffectedPaths, SectionUpdate, UpdateContext, UpdateSectionError,
};
use crate::trips::derive_journey_trips;
use odsurvey_core::{response_path, Changeset, InterviewDocument};
use odsurvey_sdk::od::{
    active_journey, active_person, select_next_incomplete_trip, ACTIVE_SECTION,
};
use serde_json::Value;

pub const SEGMENTS_SECTION: &str = "segments";
pub const TRIPS_INTRO_SECTION: &str = "tripsIntro";

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentsEntry {
    /// `segments`, or `tripsIntro` when there is no journey to describe.
    pub section: String,
    pub update: SectionUpdate,
    pub focus_trip: Option<String>,
}

/// Prepares the segments screen: syncs the active journey's trips with its
/// visited places and refreshes the section. Without an active person or
/// journey the respondent is sent back to the trips introduction.
pub fn enter_segments_section(
    context: &UpdateContext<'_>,
    document: InterviewDocument,
) -> Result<SegmentsEntry, UpdateSectionError> {
    let derivation = active_person(&document).and_then(|person| {
        let journey = active_journey(&document, &person)?;
        derive_journey_trips(&document, person.0.uuid, journey.0.uuid)
    });

    let Some(derivation) = derivation else {
        tracing::info!("no active journey, redirecting to the trips introduction");
        let mut proposed = Changeset::new();
        proposed.set(
            response_path(ACTIVE_SECTION),
            Value::String(TRIPS_INTRO_SECTION.to_string()),
        );
        let update = update_section(
            context,
            TRIPS_INTRO_SECTION,
            document,
            AffectedPaths::new(),
            &proposed,
        )?;
        return Ok(SegmentsEntry {
            section: TRIPS_INTRO_SECTION.to_string(),
            update,
            focus_trip: None,
        });
    };

    let update = update_section(
        context,
        SEGMENTS_SECTION,
        document,
        AffectedPaths::new(),
        &derivation.changeset,
    )?;
    Ok(SegmentsEntry {
        section: SEGMENTS_SECTION.to_string(),
        update,
        focus_trip: derivation.focus_trip,
    })
}

/// Every trip of the active journey has its segments closed. A respondent
/// without an active journey has nothing left to describe.
pub fn segments_section_complete(document: &InterviewDocument) -> bool {
    let Some(person) = active_person(document) else {
        return true;
    };
    let Some(journey) = active_journey(document, &person) else {
        return true;
    };
    select_next_incomplete_trip(&journey).is_none()
}

#[cfg(test)]
#[path = "section_test.rs"]
mod tests;
