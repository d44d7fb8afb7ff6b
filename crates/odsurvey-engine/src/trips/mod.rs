mod derive;
mod section;

pub use derive::{derive_journey_trips, TripDerivation};
pub use section::{
    enter_segments_section, segments_section_complete, SegmentsEntry, SEGMENTS_SECTION,
    TRIPS_INTRO_SECTION,
};
