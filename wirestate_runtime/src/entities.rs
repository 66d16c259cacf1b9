//! Entity lookup seam.
//!
//! Records cross the wire as `(model, key)` references only; the model
//! synthesizer and entity-bound mount parameters re-fetch them here.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use wirestate_kernel::domain::Record;

use crate::error::EngineError;

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn find(&self, model: &str, key: &Value) -> Result<Option<Record>, EngineError>;

    async fn find_or_fail(&self, model: &str, key: &Value) -> Result<Record, EngineError> {
        self.find(model, key)
            .await?
            .ok_or_else(|| EngineError::EntityNotFound {
                model: model.to_string(),
                key: key_string(key),
            })
    }
}

/// Keys compare by their scalar text, so `7` and `"7"` address the same row.
fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// In-process entity table.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    records: RwLock<HashMap<(String, String), Record>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, record: Record) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&self, record: Record) {
        let slot = (record.model.clone(), key_string(&record.key));
        self.records.write().insert(slot, record);
    }

    pub fn remove(&self, model: &str, key: &Value) -> Option<Record> {
        self.records
            .write()
            .remove(&(model.to_string(), key_string(key)))
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn find(&self, model: &str, key: &Value) -> Result<Option<Record>, EngineError> {
        Ok(self
            .records
            .read()
            .get(&(model.to_string(), key_string(key)))
            .cloned())
    }
}
