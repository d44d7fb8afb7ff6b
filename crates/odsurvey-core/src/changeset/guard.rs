use crate::changeset::ALL_PATHS_MARKER;
use crate::response_path::split_path;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHANGESET_ALLOW_ROOTS: &[&str] = &["responses", "validations"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesetGuardPolicy {
    pub enabled: bool,
    pub allow_roots: Vec<String>,
    #[serde(default)]
    pub allow_path_patterns: Vec<String>,
}

impl Default for ChangesetGuardPolicy {
    fn default() -> Self {
        build_changeset_guard_policy()
    }
}

pub fn build_changeset_guard_policy() -> ChangesetGuardPolicy {
    ChangesetGuardPolicy {
        enabled: true,
        allow_roots: DEFAULT_CHANGESET_ALLOW_ROOTS
            .iter()
            .map(|value| value.to_string())
            .collect(),
        allow_path_patterns: Vec::new(),
    }
}

pub fn check_changeset_path_allowed(
    path: &str,
    policy: &ChangesetGuardPolicy,
) -> Result<(), String> {
    let parts = split_path(path).map_err(|_| "invalid_path".to_string())?;
    if !policy.enabled || path == ALL_PATHS_MARKER {
        return Ok(());
    }

    let root = parts.first().copied().ok_or_else(|| "invalid_path".to_string())?;
    if policy.allow_roots.iter().any(|allowed| allowed == root) {
        return Ok(());
    }

    for pattern in &policy.allow_path_patterns {
        let regex = Regex::new(pattern).map_err(|err| format!("invalid_regex:{err}"))?;
        if regex.is_match(path) {
            return Ok(());
        }
    }

    Err(format!("root_not_allowed:{root}"))
}
