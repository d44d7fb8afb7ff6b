pub mod engine;
pub mod queue;
pub mod trips;

pub use engine::{
    apply_server_update, describe_section, prepare_interview_update, update_section,
    AffectedPaths, DescribedWidget, PreparedUpdate, SectionUpdate, UpdateContext,
    UpdateSectionError, WidgetStatus,
};
pub use queue::{
    Delivery, LoadingGuard, LoadingState, TransportError, UpdateQueue, UpdateRequest,
    UpdateResponse, UpdateStatus, UpdateTransport,
};
pub use trips::{
    derive_journey_trips, enter_segments_section, segments_section_complete, SegmentsEntry,
    TripDerivation, SEGMENTS_SECTION, TRIPS_INTRO_SECTION,
};
