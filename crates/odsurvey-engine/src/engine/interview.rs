use crate::engine::{
    update_section, AffectedPaths, SectionUpdate, UpdateContext, UpdateSectionError,
};
use odsurvey_core::{response_path, Changeset, InterviewDocument, WireChangeset};
use odsurvey_sdk::od::{ACTIVE_SECTION, LANGUAGE};
use serde_json::{Map, Value};

/// Result of preparing a local interview update.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpdate {
    /// The section that was evaluated.
    pub section: String,
    pub update: SectionUpdate,
    /// What to send to the backend; `None` when only the `_all` marker is
    /// left (a form submission with nothing to persist).
    pub wire: Option<WireChangeset>,
}

/// Runs one client-side update: unsets `unset_paths`, applies
/// `values_by_path`, syncs `_language` with the configured language, then
/// updates the active section. The active section is `_activeSection` after
/// the proposed values are applied, or `requested_section` when unset.
pub fn prepare_interview_update(
    context: &UpdateContext<'_>,
    requested_section: &str,
    document: InterviewDocument,
    values_by_path: Changeset,
    unset_paths: &[String],
) -> Result<PreparedUpdate, UpdateSectionError> {
    let mut proposed = values_by_path;
    for path in unset_paths {
        proposed.unset(path.clone());
    }

    let language_path = response_path(LANGUAGE);
    let language = context.config.language.as_str();
    if document.response_str(LANGUAGE) != Some(language) && proposed.get(&language_path).is_none()
    {
        proposed.set(language_path, Value::String(language.to_string()));
    }

    let section = active_section(&document, &proposed, requested_section);
    let update = update_section(
        context,
        &section,
        document,
        AffectedPaths::new(),
        &proposed,
    )?;

    let wire = update.applied.clone().into_wire();
    let wire = if wire.is_empty() || wire.only_marks_all() {
        None
    } else {
        Some(wire)
    };
    tracing::debug!(
        section = section.as_str(),
        changes = wire.as_ref().map_or(0, |wire| wire.values_by_path.len()),
        unsets = wire.as_ref().map_or(0, |wire| wire.unset_paths.len()),
        "interview update prepared"
    );

    Ok(PreparedUpdate {
        section,
        update,
        wire,
    })
}

/// Folds values assigned by the backend into the document and refreshes the
/// active section's widget statuses.
pub fn apply_server_update(
    context: &UpdateContext<'_>,
    requested_section: &str,
    document: InterviewDocument,
    updated_values_by_path: &Map<String, Value>,
) -> Result<SectionUpdate, UpdateSectionError> {
    let mut proposed = Changeset::new();
    for (path, value) in updated_values_by_path {
        proposed.set(path.clone(), value.clone());
    }
    let section = active_section(&document, &proposed, requested_section);
    update_section(context, &section, document, AffectedPaths::new(), &proposed)
}

fn active_section(document: &InterviewDocument, proposed: &Changeset, requested: &str) -> String {
    let proposed_path = response_path(ACTIVE_SECTION);
    let from_proposed = match proposed.get(&proposed_path) {
        Some(Some(value)) => value.as_str(),
        Some(None) => None,
        None if proposed.is_unset(&proposed_path) => None,
        None => document.response_str(ACTIVE_SECTION),
    };
    from_proposed.unwrap_or(requested).to_string()
}

#[cfg(test)]
#[path = "interview_test.rs"]
mod tests;
