/// Wirestate — Ephemeral Store
///
/// Per-pass keyed value accumulator. One store lives for exactly one
/// mount/update pass and is dropped with it; entries are keyed by the
/// identity of the live component instance, never by its wire id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};

/// Identity of one live component instance. Never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey(u64);

impl InstanceKey {
    /// Allocate a fresh identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Pass-scoped key/value state for every component touched by the pass.
#[derive(Debug, Default)]
pub struct EphemeralStore {
    lookup: HashMap<InstanceKey, Map<String, Value>>,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the list under `key`, or set `value` under
    /// `index_key` in the map under `key` when an index is given.
    pub fn push(&mut self, component: InstanceKey, key: &str, value: Value, index_key: Option<&str>) {
        let slot = self
            .lookup
            .entry(component)
            .or_default()
            .entry(key.to_string())
            .or_insert(Value::Null);
        push_value(slot, value, index_key);
    }

    /// Overwrite the value under `key`.
    pub fn set(&mut self, component: InstanceKey, key: &str, value: Value) {
        self.lookup
            .entry(component)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Stored value, or an empty list when nothing was stored.
    pub fn get(&self, component: InstanceKey, key: &str) -> Value {
        self.get_ref(component, key)
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()))
    }

    pub fn get_ref(&self, component: InstanceKey, key: &str) -> Option<&Value> {
        self.lookup.get(&component).and_then(|entries| entries.get(key))
    }

    pub fn has(&self, component: InstanceKey, key: &str) -> bool {
        self.get_ref(component, key).is_some()
    }

    /// A flag-like entry: the stored value itself, or the first element
    /// when the entry was pushed as a list.
    pub fn first(&self, component: InstanceKey, key: &str) -> Option<Value> {
        match self.get_ref(component, key)? {
            Value::Array(items) => items.first().cloned(),
            other => Some(other.clone()),
        }
    }

    /// Drop every entry recorded for `component`.
    pub fn forget(&mut self, component: InstanceKey) {
        self.lookup.remove(&component);
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Shared push semantics for the store, effects and memo.
///
/// Without an index the slot becomes (or stays) a list and `value` is
/// appended. With an index the slot becomes (or stays) a map and `value`
/// is written under the index; a list slot accepts an in-range numeric
/// index as an element overwrite.
pub(crate) fn push_value(slot: &mut Value, value: Value, index_key: Option<&str>) {
    match index_key {
        None => match slot {
            Value::Array(items) => items.push(value),
            Value::Null => *slot = Value::Array(vec![value]),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value]);
            }
        },
        Some(index) => {
            if let Value::Array(items) = slot {
                if let Ok(i) = index.parse::<usize>() {
                    if i < items.len() {
                        items[i] = value;
                        return;
                    }
                }
            }
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(map) = slot {
                map.insert(index.to_string(), value);
            }
        }
    }
}
