/// Wirestate — Property Paths and Name Casing
///
/// Dotted property paths (`items.2.title`) addressing nested component
/// state, plus the casing helpers used to derive hook method names and
/// view paths from property and component names.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::Prop;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("property path is empty")]
    Empty,
    #[error("property path {0:?} has an empty segment")]
    EmptySegment(String),
    #[error("segment {segment:?} cannot be set inside a {type_name} value")]
    NotNavigable {
        segment: String,
        type_name: &'static str,
    },
    #[error("list index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Split a dotted path into its segments.
pub fn split(path: &str) -> Result<Vec<&str>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptySegment(path.to_string()));
    }
    Ok(segments)
}

/// Root property named by a dotted path.
pub fn root(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

// ---------------------------------------------------------------------------
// JSON navigation
// ---------------------------------------------------------------------------

pub fn get_in_value<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(*segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Write `new_value` at `segments` inside `target`, creating intermediate
/// maps where the path runs through null or missing entries.
pub fn set_in_value(target: &mut Value, segments: &[&str], new_value: Value) -> Result<(), PathError> {
    let Some((head, rest)) = segments.split_first() else {
        *target = new_value;
        return Ok(());
    };

    if target.is_null() {
        *target = Value::Object(Map::new());
    }

    match target {
        Value::Object(map) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_in_value(child, rest, new_value)
        }
        Value::Array(items) => {
            let index = parse_index(head, "array")?;
            let len = items.len();
            if index == len {
                items.push(Value::Null);
            }
            let child = items
                .get_mut(index)
                .ok_or(PathError::OutOfRange { index, len })?;
            set_in_value(child, rest, new_value)
        }
        other => Err(PathError::NotNavigable {
            segment: head.to_string(),
            type_name: json_type_name(other),
        }),
    }
}

// ---------------------------------------------------------------------------
// Live property navigation
// ---------------------------------------------------------------------------

/// Write `new_value` at `segments` inside a live property.
///
/// Lists are addressed by index (one past the end appends), records by
/// attribute name. Custom values are opaque.
pub fn set_in_prop(prop: &mut Prop, segments: &[&str], new_value: Value) -> Result<(), PathError> {
    let Some((head, rest)) = segments.split_first() else {
        *prop = replacement(prop, new_value);
        return Ok(());
    };

    match prop {
        Prop::Value(v) => set_in_value(v, segments, new_value),
        Prop::List(items) => {
            let index = parse_index(head, "list")?;
            let len = items.len();
            if index == len {
                items.push(Prop::null());
            }
            let child = items
                .get_mut(index)
                .ok_or(PathError::OutOfRange { index, len })?;
            set_in_prop(child, rest, new_value)
        }
        Prop::Record(record) => {
            let child = record
                .attributes
                .entry(head.to_string())
                .or_insert(Value::Null);
            set_in_value(child, rest, new_value)
        }
        Prop::Custom(c) => Err(PathError::NotNavigable {
            segment: head.to_string(),
            type_name: c.type_name(),
        }),
    }
}

/// A whole-value write keeps a list a list.
fn replacement(current: &Prop, new_value: Value) -> Prop {
    match (current, new_value) {
        (Prop::List(_), Value::Array(items)) => {
            Prop::List(items.into_iter().map(Prop::Value).collect())
        }
        (_, other) => Prop::Value(other),
    }
}

fn parse_index(segment: &str, type_name: &'static str) -> Result<usize, PathError> {
    segment.parse::<usize>().map_err(|_| PathError::NotNavigable {
        segment: segment.to_string(),
        type_name,
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Casing
// ---------------------------------------------------------------------------

/// `first_name.city` -> `FirstNameCity`; used for `updating<Prop>` hooks.
pub fn studly(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c == '.' || c == ' ')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `UserProfile` / `user_profile` -> `user-profile`. Dots are kept.
pub fn dash_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch == '_' || ch == ' ' {
            out.push('-');
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
