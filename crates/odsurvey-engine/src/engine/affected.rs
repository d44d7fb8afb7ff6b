use odsurvey_core::{Changeset, ALL_PATHS_MARKER, RESPONSES_ROOT, VALIDATIONS_ROOT};
use odsurvey_sdk::RuleDependencies;
use std::collections::BTreeSet;

/// Response paths changed by the current update, relative to `responses`.
/// `all` is the `_all` wildcard: every widget counts as affected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedPaths {
    all: bool,
    paths: BTreeSet<String>,
}

impl AffectedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn everything() -> Self {
        Self {
            all: true,
            paths: BTreeSet::new(),
        }
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut affected = Self::new();
        for path in paths {
            affected.insert(path.as_ref());
        }
        affected
    }

    /// Accepts `_all`, absolute `responses.` paths or relative paths.
    /// `validations.` paths never affect widgets and are ignored.
    pub fn insert(&mut self, path: &str) {
        if path == ALL_PATHS_MARKER {
            self.all = true;
            return;
        }
        if path == VALIDATIONS_ROOT || path.starts_with("validations.") {
            return;
        }
        let relative = path
            .strip_prefix(RESPONSES_ROOT)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(path);
        if relative == RESPONSES_ROOT {
            self.all = true;
        } else if !relative.is_empty() {
            self.paths.insert(relative.to_string());
        }
    }

    pub fn mark_all(&mut self) {
        self.all = true;
    }

    pub fn extend_from_changeset(&mut self, changeset: &Changeset) {
        if changeset.is_all() {
            self.all = true;
        }
        for path in changeset.touched_paths() {
            self.insert(path);
        }
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.paths.is_empty()
    }

    pub fn paths(&self) -> &BTreeSet<String> {
        &self.paths
    }

    /// Exact match or wildcard.
    pub fn contains(&self, path: &str) -> bool {
        self.all || self.paths.contains(path)
    }

    /// True when `path` equals, contains or sits inside an affected path.
    pub fn touches(&self, path: &str) -> bool {
        self.all || self.paths.iter().any(|affected| paths_overlap(affected, path))
    }

    pub fn intersects(&self, dependencies: &RuleDependencies) -> bool {
        if self.all {
            return true;
        }
        match dependencies {
            RuleDependencies::All => !self.paths.is_empty(),
            RuleDependencies::Paths(paths) => paths.iter().any(|path| self.touches(path)),
        }
    }
}

fn paths_overlap(left: &str, right: &str) -> bool {
    is_same_or_ancestor(left, right) || is_same_or_ancestor(right, left)
}

fn is_same_or_ancestor(ancestor: &str, path: &str) -> bool {
    match path.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}
