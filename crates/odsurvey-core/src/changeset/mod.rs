mod apply;
mod guard;

pub use apply::{apply_changeset, ChangesetApplyResult, ChangesetAudit, ChangesetRejection};
pub use guard::{
    build_changeset_guard_policy, check_changeset_path_allowed, ChangesetGuardPolicy,
    DEFAULT_CHANGESET_ALLOW_ROOTS,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Wildcard key: every widget is considered affected.
pub const ALL_PATHS_MARKER: &str = "_all";

/// A set of absolute-path assignments plus paths to delete.
///
/// A `None` value means "make undefined" and is applied as an unset.
/// Unsets are always applied before assignments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    values_by_path: BTreeMap<String, Option<Value>>,
    unset_paths: Vec<String>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) -> &mut Self {
        self.values_by_path.insert(path.into(), Some(value));
        self
    }

    pub fn set_undefined(&mut self, path: impl Into<String>) -> &mut Self {
        self.values_by_path.insert(path.into(), None);
        self
    }

    pub fn set_change(&mut self, path: impl Into<String>, value: Option<Value>) -> &mut Self {
        self.values_by_path.insert(path.into(), value);
        self
    }

    pub fn unset(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        if !self.unset_paths.contains(&path) {
            self.unset_paths.push(path);
        }
        self
    }

    pub fn mark_all(&mut self) -> &mut Self {
        self.values_by_path
            .insert(ALL_PATHS_MARKER.to_string(), Some(Value::Bool(true)));
        self
    }

    pub fn is_all(&self) -> bool {
        self.values_by_path.contains_key(ALL_PATHS_MARKER)
    }

    /// Folds `other` into `self`; assignments in `other` win.
    pub fn merge(&mut self, other: Changeset) -> &mut Self {
        for path in other.unset_paths {
            self.unset(path);
        }
        self.values_by_path.extend(other.values_by_path);
        self
    }

    pub fn get(&self, path: &str) -> Option<&Option<Value>> {
        self.values_by_path.get(path)
    }

    pub fn value(&self, path: &str) -> Option<&Value> {
        self.values_by_path.get(path).and_then(Option::as_ref)
    }

    pub fn is_unset(&self, path: &str) -> bool {
        self.unset_paths.iter().any(|unset| unset == path)
            || matches!(self.values_by_path.get(path), Some(None))
    }

    pub fn values_by_path(&self) -> &BTreeMap<String, Option<Value>> {
        &self.values_by_path
    }

    pub fn unset_paths(&self) -> &[String] {
        &self.unset_paths
    }

    pub fn is_empty(&self) -> bool {
        self.values_by_path.is_empty() && self.unset_paths.is_empty()
    }

    /// Every path this changeset writes or deletes, wildcard excluded.
    pub fn touched_paths(&self) -> impl Iterator<Item = &str> {
        self.unset_paths
            .iter()
            .map(String::as_str)
            .chain(self.values_by_path.keys().map(String::as_str))
            .filter(|path| *path != ALL_PATHS_MARKER)
    }

    /// Wire form: undefined values move to `unset_paths`.
    pub fn into_wire(self) -> WireChangeset {
        let mut wire = WireChangeset {
            values_by_path: Map::new(),
            unset_paths: self.unset_paths,
        };
        for (path, value) in self.values_by_path {
            match value {
                Some(value) => {
                    wire.values_by_path.insert(path, value);
                }
                None => {
                    if !wire.unset_paths.contains(&path) {
                        wire.unset_paths.push(path);
                    }
                }
            }
        }
        wire
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChangeset {
    #[serde(default)]
    pub values_by_path: Map<String, Value>,
    #[serde(default)]
    pub unset_paths: Vec<String>,
}

impl WireChangeset {
    pub fn is_empty(&self) -> bool {
        self.values_by_path.is_empty() && self.unset_paths.is_empty()
    }

    /// True when the only content is the `_all` wildcard.
    pub fn only_marks_all(&self) -> bool {
        self.unset_paths.is_empty()
            && self.values_by_path.len() == 1
            && self.values_by_path.contains_key(ALL_PATHS_MARKER)
    }
}

impl From<WireChangeset> for Changeset {
    fn from(wire: WireChangeset) -> Self {
        let mut changeset = Changeset::new();
        for path in wire.unset_paths {
            changeset.unset(path);
        }
        for (path, value) in wire.values_by_path {
            changeset.set(path, value);
        }
        changeset
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
