use crate::changeset::Changeset;
use crate::document::{response_path, strip_responses_prefix, validation_path, InterviewDocument};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

pub const UUID_FIELD: &str = "uuid";
pub const SEQUENCE_FIELD: &str = "sequence";

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMember<'a> {
    pub uuid: &'a str,
    pub sequence: Option<i64>,
    pub value: &'a Value,
}

pub fn member_sequence(member: &Value) -> Option<i64> {
    let sequence = member.get(SEQUENCE_FIELD)?;
    sequence
        .as_i64()
        .or_else(|| sequence.as_f64().map(|value| value as i64))
        .or_else(|| sequence.as_str().and_then(|value| value.trim().parse().ok()))
}

/// Members of a grouped collection ordered by `sequence`.
/// Members without a sequence sort last, ties break on the key.
pub fn sorted_members(collection: Option<&Value>) -> Vec<GroupedMember<'_>> {
    let Some(collection) = collection.and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut members = collection
        .iter()
        .filter(|(_, value)| value.is_object())
        .map(|(uuid, value)| GroupedMember {
            uuid: uuid.as_str(),
            sequence: member_sequence(value),
            value,
        })
        .collect::<Vec<_>>();
    members.sort_by(|left, right| {
        let left_key = (left.sequence.is_none(), left.sequence, left.uuid);
        let right_key = (right.sequence.is_none(), right.sequence, right.uuid);
        left_key.cmp(&right_key)
    });
    members
}

/// Clamps a requested 1-based insert position; missing or non-positive means append.
pub fn normalize_insert_sequence(insert_sequence: Option<i64>, member_count: usize) -> usize {
    let append = member_count + 1;
    match insert_sequence {
        Some(sequence) if sequence > 0 => {
            usize::try_from(sequence).map_or(append, |sequence| sequence.min(append))
        }
        _ => append,
    }
}

/// Builds the changeset inserting `count` new members into the collection at
/// `collection_path` (relative to `responses`). New members take positions
/// `insert_sequence..insert_sequence + count`, existing members at or after
/// that position shift down, and each new member gets an empty validation
/// subtree. `attributes[i]` seeds the i-th new member.
pub fn add_grouped_objects(
    document: &InterviewDocument,
    count: usize,
    insert_sequence: Option<i64>,
    collection_path: &str,
    attributes: &[Map<String, Value>],
) -> Changeset {
    let collection_path = strip_responses_prefix(collection_path);
    let mut changeset = Changeset::new();
    if count == 0 {
        return changeset;
    }

    let members = sorted_members(document.response(collection_path));
    let insert_at = normalize_insert_sequence(insert_sequence, members.len());

    for (index, member) in members.iter().enumerate() {
        let rank = index + 1;
        let target = if rank >= insert_at { rank + count } else { rank };
        if member.sequence != Some(target as i64) {
            changeset.set(
                response_path(&format!("{collection_path}.{}.{SEQUENCE_FIELD}", member.uuid)),
                json!(target),
            );
        }
    }

    for offset in 0..count {
        let uuid = Uuid::new_v4().to_string();
        let mut object = attributes.get(offset).cloned().unwrap_or_default();
        object.insert(UUID_FIELD.to_string(), json!(uuid));
        object.insert(SEQUENCE_FIELD.to_string(), json!(insert_at + offset));

        let member_path = format!("{collection_path}.{uuid}");
        changeset.set(response_path(&member_path), Value::Object(object));
        changeset.set(validation_path(&member_path), Value::Object(Map::new()));
    }

    tracing::debug!(collection = collection_path, count, insert_at, "grouped objects added");
    changeset
}

/// Builds the changeset deleting the members at `member_paths` (each
/// `<collection>.<uuid>`, optionally prefixed with `responses.`) and their
/// validation subtrees, then renumbering survivors to `1..n`.
pub fn remove_grouped_objects(document: &InterviewDocument, member_paths: &[String]) -> Changeset {
    let mut changeset = Changeset::new();
    let mut removed_by_collection = BTreeMap::<&str, BTreeSet<&str>>::new();

    for member_path in member_paths {
        let member_path = strip_responses_prefix(member_path);
        let Some((collection, uuid)) = member_path.rsplit_once('.') else {
            tracing::debug!(path = member_path, "grouped member path has no collection, skipping");
            continue;
        };
        removed_by_collection
            .entry(collection)
            .or_default()
            .insert(uuid);
        changeset.unset(response_path(member_path));
        changeset.unset(validation_path(member_path));
    }

    for (collection, removed) in &removed_by_collection {
        let survivors = sorted_members(document.response(collection))
            .into_iter()
            .filter(|member| !removed.contains(member.uuid));
        for (index, member) in survivors.enumerate() {
            let target = index + 1;
            if member.sequence != Some(target as i64) {
                changeset.set(
                    response_path(&format!("{collection}.{}.{SEQUENCE_FIELD}", member.uuid)),
                    json!(target),
                );
            }
        }
    }

    changeset
}

#[cfg(test)]
#[path = "grouped_test.rs"]
mod tests;
