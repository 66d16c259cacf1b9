//! Engine error taxonomy.
//!
//! Integrity and resolution failures abort the pass. Validation and
//! locked-property failures raised by a method call are caught by the
//! call loop and flashed instead.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use wirestate_kernel::hashing::ChecksumError;
use wirestate_kernel::invariants::InvariantError;
use wirestate_kernel::path::PathError;

use crate::config::ConfigError;
use crate::snapshot_codec::CodecError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("corrupt payload: {0}")]
    CorruptPayload(#[from] ChecksumError),

    #[error("malformed snapshot: {0}")]
    Invariant(#[from] InvariantError),

    #[error("component {0:?} is not registered")]
    ComponentNotFound(String),

    #[error("no synthesizer registered under key {0:?}")]
    UnknownSynthesizer(String),

    #[error("property {path:?} holds a {type_name} value no synthesizer supports")]
    UnsupportedType { path: String, type_name: String },

    #[error("cannot update locked property: [{0}]")]
    LockedProperty(String),

    #[error("method {method:?} does not exist on component {component:?}")]
    MethodNotFound { component: String, method: String },

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("invalid property path: {0}")]
    Path(#[from] PathError),

    #[error("view {path:?} failed: {message}")]
    View { path: String, message: String },

    #[error("{model} with key {key} not found")]
    EntityNotFound { model: String, key: String },

    #[error("request aborted with status {status}")]
    RequestAborted { status: u16, body: String },

    #[error("pass state accessed outside a lifecycle pass")]
    OutsidePass,

    #[error("could not find an HTML tag in the component markup")]
    MissingRootElement,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Application-level failure raised by component code.
    #[error("{0}")]
    Component(String),
}

impl EngineError {
    pub fn component(message: impl Into<String>) -> Self {
        EngineError::Component(message.into())
    }

    /// Errors the call loop converts into flashed messages.
    pub fn is_recoverable_in_call(&self) -> bool {
        matches!(self, EngineError::Validation(_) | EngineError::LockedProperty(_))
    }
}

/// Field name -> messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, message: &str) -> Self {
        self.add(field, message);
        self
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(field, messages)| {
                let list = messages.iter().cloned().map(Value::String).collect();
                (field.clone(), Value::Array(list))
            })
            .collect();
        Value::Object(map)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields [{}]", fields.join(", "))
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        EngineError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validation_errors_group_by_field() {
        let errors = ValidationErrors::new()
            .with("email", "required")
            .with("email", "must be an address")
            .with("age", "too low");
        assert_eq!(
            errors.to_json(),
            json!({"age": ["too low"], "email": ["required", "must be an address"]})
        );
        assert_eq!(errors.to_string(), "invalid fields [age, email]");
    }

    #[test]
    fn checksum_failures_become_corrupt_payload() {
        let err: EngineError = ChecksumError::Corrupt.into();
        assert!(matches!(err, EngineError::CorruptPayload(_)));
        assert!(!err.is_recoverable_in_call());
        assert!(EngineError::LockedProperty("x".into()).is_recoverable_in_call());
    }
}
