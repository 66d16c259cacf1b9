/// Wirestate — Invariant Checks
///
/// Shape rules every snapshot and component name must satisfy before the
/// engine trusts it. Non-panicking; callers decide how to surface failures.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::Snapshot;

/// Memo keys present on every snapshot the engine produces.
pub const REQUIRED_MEMO_KEYS: &[&str] = &[
    "id", "name", "path", "method", "children", "scripts", "assets", "errors", "locale",
];

/// Meta key naming the synthesizer of a tagged tuple.
pub const SYNTH_KEY: &str = "s";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError {
    #[error("[INVARIANT:memo_keys] snapshot memo is missing {0:?}")]
    MissingMemoKey(String),
    #[error("[INVARIANT:memo_type] memo key {key:?} must be {expected}")]
    MemoType { key: String, expected: &'static str },
    #[error("[INVARIANT:component_name] component name {0:?} must match [a-zA-Z0-9_.-]+")]
    ComponentName(String),
}

// ---------------------------------------------------------------------------
// Tuple shape
// ---------------------------------------------------------------------------

/// True when `value` looks like a synthesized tuple: a two-element array
/// whose second element is an object carrying a string `s`.
pub fn is_synthetic_tuple(value: &Value) -> bool {
    match value {
        Value::Array(items) if items.len() == 2 => items[1]
            .as_object()
            .and_then(|meta| meta.get(SYNTH_KEY))
            .map_or(false, Value::is_string),
        _ => false,
    }
}

/// True when `value` or anything nested inside it has the tuple shape.
pub fn contains_synthetic_shape(value: &Value) -> bool {
    if is_synthetic_tuple(value) {
        return true;
    }
    match value {
        Value::Array(items) => items.iter().any(contains_synthetic_shape),
        Value::Object(map) => map.values().any(contains_synthetic_shape),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Snapshot and name checks
// ---------------------------------------------------------------------------

/// Check the memo of a decoded snapshot carries the engine's required keys.
pub fn try_validate_snapshot(snapshot: &Snapshot) -> Result<(), InvariantError> {
    for key in REQUIRED_MEMO_KEYS {
        if !snapshot.memo.contains_key(*key) {
            return Err(InvariantError::MissingMemoKey(key.to_string()));
        }
    }
    require_string(&snapshot.memo, "id")?;
    require_string(&snapshot.memo, "name")?;
    if let Some(name) = snapshot.name() {
        validate_component_name(name)?;
    }
    Ok(())
}

fn require_string(memo: &Map<String, Value>, key: &str) -> Result<(), InvariantError> {
    match memo.get(key) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(InvariantError::MemoType {
            key: key.to_string(),
            expected: "a string",
        }),
    }
}

/// Component names are ASCII `[a-zA-Z0-9_.-]+`.
pub fn validate_component_name(name: &str) -> Result<(), InvariantError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.');
    if valid {
        Ok(())
    } else {
        Err(InvariantError::ComponentName(name.to_string()))
    }
}
