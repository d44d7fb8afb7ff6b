mod affected;
mod interview;
mod section;

pub use affected::AffectedPaths;
pub use interview::{apply_server_update, prepare_interview_update, PreparedUpdate};
pub use section::{
    describe_section, update_section, DescribedWidget, SectionUpdate, UpdateContext,
    UpdateSectionError, WidgetStatus,
};
