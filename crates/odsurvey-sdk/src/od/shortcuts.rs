use crate::od::{
    all_visited_places, Person, VisitedPlace, GEOGRAPHY_FIELD, NAME_FIELD, SHORTCUT_FIELD,
};
use odsurvey_core::{response_path, strip_responses_prefix, Changeset, InterviewDocument};
use serde_json::Value;
use std::collections::BTreeSet;

/// Where following a place's shortcuts ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutChain {
    /// Path of the concrete place ending the chain.
    Concrete(String),
    /// The chain revisits a place; paths in visit order.
    Cycle(Vec<String>),
    /// The chain points at a path holding no place.
    Dangling(String),
}

pub fn follow_shortcut_chain(document: &InterviewDocument, place_path: &str) -> ShortcutChain {
    let mut current = strip_responses_prefix(place_path).to_string();
    let mut visited = Vec::<String>::new();
    let mut seen = BTreeSet::<String>::new();

    loop {
        if !seen.insert(current.clone()) {
            visited.push(current);
            return ShortcutChain::Cycle(visited);
        }
        let Some(place) = document.response(&current).filter(|value| value.is_object()) else {
            return ShortcutChain::Dangling(current);
        };
        let next = place
            .get(SHORTCUT_FIELD)
            .and_then(Value::as_str)
            .map(strip_responses_prefix)
            .filter(|target| !target.is_empty());
        match next {
            Some(target) => {
                visited.push(current);
                current = target.to_string();
            }
            None => return ShortcutChain::Concrete(current),
        }
    }
}

/// Path of the concrete place behind `place_path`, `None` on a cycle or a
/// dangling reference.
pub fn resolve_shortcut_chain(document: &InterviewDocument, place_path: &str) -> Option<String> {
    match follow_shortcut_chain(document, place_path) {
        ShortcutChain::Concrete(path) => Some(path),
        ShortcutChain::Cycle(chain) => {
            tracing::warn!(place = place_path, ?chain, "visited place shortcut chain is cyclic");
            None
        }
        ShortcutChain::Dangling(path) => {
            tracing::debug!(
                place = place_path,
                target = path.as_str(),
                "visited place shortcut is dangling"
            );
            None
        }
    }
}

/// Rewrites every place that shortcuts directly to `target_path` before that
/// target is edited or removed.
///
/// The first follower in traversal order becomes the canonical holder: it
/// inherits the target's own shortcut when the target was itself a shortcut,
/// otherwise it becomes concrete with the target's name. Its geography always
/// takes the target's geography. Every other follower then points at the
/// canonical holder. A target chain that leads back to any follower cannot
/// be inherited without a cycle; the holder becomes concrete instead and a
/// warning is logged. Returns `None` when nothing shortcuts to the target.
pub fn replace_visited_place_shortcuts(
    document: &InterviewDocument,
    target_path: &str,
) -> Option<Changeset> {
    let target_path = strip_responses_prefix(target_path);
    let followers = all_visited_places(document)
        .into_iter()
        .map(|(_, place)| place)
        .filter(|place| place.0.path != target_path)
        .filter(|place| place.shortcut().map(strip_responses_prefix) == Some(target_path))
        .collect::<Vec<_>>();
    let (canonical, others) = followers.split_first()?;

    let target = document.response(target_path);
    let target_field = |field: &str| {
        target
            .and_then(|place| place.get(field))
            .filter(|value| !value.is_null())
            .cloned()
    };
    let canonical_field = |field: &str| response_path(&format!("{}.{field}", canonical.0.path));

    let mut changeset = Changeset::new();
    let mut inherited_shortcut = target_field(SHORTCUT_FIELD);
    let follower_paths = followers
        .iter()
        .map(|place| place.0.path.as_str())
        .collect::<BTreeSet<_>>();
    if let Some(shortcut) = inherited_shortcut.as_ref().and_then(Value::as_str) {
        if chain_reaches(document, shortcut, &follower_paths) {
            tracing::warn!(
                target = target_path,
                shortcut,
                canonical = canonical.0.path.as_str(),
                "target shortcut leads back to a follower, making the canonical holder concrete"
            );
            inherited_shortcut = None;
        }
    }
    match inherited_shortcut {
        Some(shortcut) => {
            changeset.set(canonical_field(SHORTCUT_FIELD), shortcut);
        }
        None => {
            changeset.unset(canonical_field(SHORTCUT_FIELD));
            changeset.set_change(canonical_field(NAME_FIELD), target_field(NAME_FIELD));
        }
    }
    changeset.set_change(canonical_field(GEOGRAPHY_FIELD), target_field(GEOGRAPHY_FIELD));

    for follower in others {
        changeset.set(
            response_path(&format!("{}.{SHORTCUT_FIELD}", follower.0.path)),
            Value::String(canonical.0.path.clone()),
        );
    }

    tracing::debug!(
        target = target_path,
        canonical = canonical.0.path.as_str(),
        followers = followers.len(),
        "visited place shortcuts replaced"
    );
    Some(changeset)
}

/// True when the shortcut chain starting at `start` visits one of `places`.
fn chain_reaches(document: &InterviewDocument, start: &str, places: &BTreeSet<&str>) -> bool {
    let mut current = strip_responses_prefix(start);
    let mut seen = BTreeSet::<&str>::new();
    while seen.insert(current) {
        if places.contains(current) {
            return true;
        }
        let next = document
            .response(current)
            .and_then(|place| place.get(SHORTCUT_FIELD))
            .and_then(Value::as_str)
            .map(strip_responses_prefix)
            .filter(|target| !target.is_empty());
        match next {
            Some(next) => current = next,
            None => return false,
        }
    }
    false
}

/// Name of the place, following shortcuts.
pub fn visited_place_name<'a>(
    document: &'a InterviewDocument,
    place: &VisitedPlace<'a>,
) -> Option<&'a str> {
    concrete_place(document, place)?
        .get(NAME_FIELD)
        .and_then(Value::as_str)
}

/// Geography of the place, following shortcuts. `home` places use the
/// household home; `workUsual`/`schoolUsual` without geography fall back to
/// the person's usual places.
pub fn visited_place_geography<'a>(
    document: &'a InterviewDocument,
    place: &VisitedPlace<'a>,
    person: Option<&Person<'a>>,
) -> Option<&'a Value> {
    let concrete = concrete_place(document, place)?;
    let activity = concrete
        .get("activity")
        .and_then(Value::as_str)
        .or_else(|| place.activity());
    if activity == Some("home") {
        return document.response("home.geography");
    }
    if let Some(geography) = concrete.get(GEOGRAPHY_FIELD).filter(|value| !value.is_null()) {
        return Some(geography);
    }
    match activity {
        Some("workUsual") => person.and_then(Person::usual_work_place),
        Some("schoolUsual") => person.and_then(Person::usual_school_place),
        _ => None,
    }
}

fn concrete_place<'a>(
    document: &'a InterviewDocument,
    place: &VisitedPlace<'a>,
) -> Option<&'a Value> {
    if place.shortcut().is_none() {
        return Some(place.0.value);
    }
    let path = resolve_shortcut_chain(document, &place.0.path)?;
    document.response(&path)
}

#[cfg(test)]
#[path = "shortcuts_test.rs"]
mod tests;
