use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Segment substituted for a `{placeholder}` that does not resolve to a scalar.
pub const UNKNOWN_SEGMENT: &str = "unknown";

const PARENT_PREFIX: &str = "../";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResponsePathError {
    #[error("path must not be empty")]
    Empty,
    #[error("empty segment in path `{0}`")]
    EmptySegment(String),
    #[error("relative path `{relative}` climbs {pops} level(s) above `{base}` which only has {available}")]
    RelativeUnderflow {
        base: String,
        relative: String,
        pops: usize,
        available: usize,
    },
}

pub fn split_path(path: &str) -> Result<Vec<&str>, ResponsePathError> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(ResponsePathError::Empty);
    }
    let segments = trimmed.split('.').collect::<Vec<_>>();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ResponsePathError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// Resolves `relative` against `path`.
///
/// Each leading `../` drops one trailing segment of `path` and the remainder of
/// `relative` is appended. A `relative` without `../` replaces `path` entirely.
/// Climbing above the first segment clamps to an empty prefix.
pub fn resolve_path(path: Option<&str>, relative: Option<&str>) -> Option<String> {
    let base = path?;
    resolve_inner(base, relative, false).unwrap_or_default()
}

/// Same as [`resolve_path`] but relative underflow is an error.
pub fn try_resolve_path(
    path: &str,
    relative: Option<&str>,
) -> Result<Option<String>, ResponsePathError> {
    resolve_inner(path, relative, true)
}

fn resolve_inner(
    base: &str,
    relative: Option<&str>,
    strict: bool,
) -> Result<Option<String>, ResponsePathError> {
    let Some(relative) = relative.filter(|relative| !relative.is_empty()) else {
        return Ok(non_empty(base));
    };

    let (pops, tail) = count_parent_segments(relative);
    if pops == 0 {
        return Ok(non_empty(relative));
    }

    let segments = if base.is_empty() {
        Vec::new()
    } else {
        base.split('.').collect::<Vec<_>>()
    };
    if pops > segments.len() {
        if strict {
            return Err(ResponsePathError::RelativeUnderflow {
                base: base.to_string(),
                relative: relative.to_string(),
                pops,
                available: segments.len(),
            });
        }
        tracing::debug!(
            base,
            relative,
            pops,
            available = segments.len(),
            "relative path climbs above its base, clamping"
        );
    }

    let keep = segments.len().saturating_sub(pops);
    let mut resolved = segments[..keep].join(".");
    if !tail.is_empty() {
        if !resolved.is_empty() {
            resolved.push('.');
        }
        resolved.push_str(tail);
    }
    Ok(non_empty(resolved.as_str()))
}

fn count_parent_segments(relative: &str) -> (usize, &str) {
    let mut pops = 0usize;
    let mut remaining = relative;
    while let Some(rest) = remaining.strip_prefix(PARENT_PREFIX) {
        pops += 1;
        remaining = rest;
    }
    (pops, remaining)
}

fn non_empty(path: &str) -> Option<String> {
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Returns the value at `path`, treating `null` as absent.
pub fn get_value<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = split_path(path).ok()?;
    let mut current = document;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn get_value_or<'a>(document: &'a Value, path: &str, default: &'a Value) -> &'a Value {
    get_value(document, path).unwrap_or(default)
}

/// Sets `value` at `path`, replacing any missing or non-object intermediate
/// with an empty object.
pub fn set_value(document: &mut Value, path: &str, value: Value) -> Result<(), ResponsePathError> {
    let segments = split_path(path)?;
    let Some((last, parents)) = segments.split_last() else {
        return Err(ResponsePathError::Empty);
    };

    let mut current = document;
    for segment in parents {
        current = ensure_object(current)
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert((*last).to_string(), value);
    Ok(())
}

pub fn unset_value(document: &mut Value, path: &str) -> Option<Value> {
    let segments = split_path(path).ok()?;
    let (last, parents) = segments.split_last()?;
    let mut current = document;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current.as_object_mut()?.remove(*last)
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("non-object values are replaced above"),
    }
}

/// Replaces every `{sub.path}` placeholder with the scalar found at `sub.path`
/// in `responses`.
pub fn interpolate_path(path: &str, responses: &Value) -> String {
    placeholder_regex()
        .replace_all(path, |captures: &Captures<'_>| {
            let placeholder = &captures[1];
            match get_value(responses, placeholder) {
                Some(Value::String(value)) => value.clone(),
                Some(Value::Number(value)) => value.to_string(),
                Some(Value::Bool(value)) => value.to_string(),
                _ => {
                    tracing::warn!(
                        path,
                        placeholder,
                        "path placeholder does not resolve to a scalar, using `{UNKNOWN_SEGMENT}`"
                    );
                    UNKNOWN_SEGMENT.to_string()
                }
            }
        })
        .into_owned()
}

/// Response paths that `{…}` placeholders in `path` read from, in order of
/// appearance.
pub fn placeholder_paths(path: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(path)
        .map(|captures| captures[1].to_string())
        .collect()
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{(.+?)\}").expect("valid regex"))
}

#[cfg(test)]
#[path = "response_path_test.rs"]
mod tests;
