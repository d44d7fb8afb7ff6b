pub mod changeset;
pub mod config;
pub mod document;
pub mod grouped;
pub mod issues;
pub mod response_path;

pub use changeset::{
    apply_changeset, build_changeset_guard_policy, check_changeset_path_allowed, Changeset,
    ChangesetApplyResult, ChangesetAudit, ChangesetGuardPolicy, ChangesetRejection, WireChangeset,
    ALL_PATHS_MARKER, DEFAULT_CHANGESET_ALLOW_ROOTS,
};
pub use config::{
    load_survey_config, parse_survey_config, validate_survey_config, EngineConfig, SegmentsConfig,
    SurveyConfig, SurveyConfigError, TransportConfig, DEFAULT_MAX_UPDATE_ITERATIONS,
    SURVEY_CONFIG_SCHEMA_0_0_1,
};
pub use document::{
    response_path, strip_responses_prefix, validation_path, InterviewDocument, RESPONSES_ROOT,
    VALIDATIONS_ROOT,
};
pub use grouped::{
    add_grouped_objects, member_sequence, normalize_insert_sequence, remove_grouped_objects,
    sorted_members, GroupedMember, SEQUENCE_FIELD, UUID_FIELD,
};
pub use issues::{IssueSeverity, StructuredIssue};
pub use response_path::{
    get_value, get_value_or, interpolate_path, placeholder_paths, resolve_path, set_value,
    split_path, try_resolve_path, unset_value, ResponsePathError, UNKNOWN_SEGMENT,
};
