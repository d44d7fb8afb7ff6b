use crate::changeset::{
    check_changeset_path_allowed, Changeset, ChangesetGuardPolicy, ALL_PATHS_MARKER,
};
use crate::document::InterviewDocument;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetRejection {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetAudit {
    pub set_count: usize,
    pub unset_count: usize,
    pub rejected_count: usize,
    pub affected_paths: Vec<String>,
    pub wildcard: bool,
    pub partial_success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetApplyResult {
    pub rejected: Vec<ChangesetRejection>,
    pub audit: ChangesetAudit,
}

impl ChangesetApplyResult {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Applies `changeset` to `document`: unsets first, then assignments.
pub fn apply_changeset(
    document: &mut InterviewDocument,
    changeset: &Changeset,
    guard_policy: &ChangesetGuardPolicy,
) -> ChangesetApplyResult {
    let mut rejected = Vec::new();
    let mut affected_paths = BTreeSet::new();
    let mut set_count = 0usize;
    let mut unset_count = 0usize;

    let undefined_paths = changeset
        .values_by_path()
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(path, _)| path);
    for path in changeset.unset_paths().iter().chain(undefined_paths) {
        if let Err(reason) = check_changeset_path_allowed(path, guard_policy) {
            tracing::warn!(
                path = path.as_str(),
                reason = reason.as_str(),
                "changeset unset rejected"
            );
            rejected.push(ChangesetRejection {
                path: path.clone(),
                reason,
            });
            continue;
        }
        document.unset(path);
        unset_count += 1;
        affected_paths.insert(path.clone());
    }

    for (path, value) in changeset.values_by_path() {
        let Some(value) = value else {
            continue;
        };
        if path == ALL_PATHS_MARKER {
            continue;
        }
        if let Err(reason) = check_changeset_path_allowed(path, guard_policy) {
            tracing::warn!(
                path = path.as_str(),
                reason = reason.as_str(),
                "changeset assignment rejected"
            );
            rejected.push(ChangesetRejection {
                path: path.clone(),
                reason,
            });
            continue;
        }
        match document.set(path, value.clone()) {
            Ok(()) => {
                set_count += 1;
                affected_paths.insert(path.clone());
            }
            Err(err) => rejected.push(ChangesetRejection {
                path: path.clone(),
                reason: err.to_string(),
            }),
        }
    }

    let rejected_count = rejected.len();
    let applied = set_count + unset_count;
    ChangesetApplyResult {
        rejected,
        audit: ChangesetAudit {
            set_count,
            unset_count,
            rejected_count,
            affected_paths: affected_paths.into_iter().collect(),
            wildcard: changeset.is_all(),
            partial_success: applied > 0 && rejected_count > 0,
        },
    }
}

#[cfg(test)]
#[path = "apply_test.rs"]
mod tests;
