/// Wirestate — Core Domain Types
///
/// Pure data. No behaviour beyond accessors and conversions.
/// Everything that crosses the wire is a `serde_json::Value`; everything
/// that lives on a component between passes is a `Prop`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Live property values ──────────────────────────────────────────

/// A property value held by a live component instance.
#[derive(Debug, Clone)]
pub enum Prop {
    /// Plain JSON. Sent as-is unless it collides with the tuple shape.
    Value(Value),
    /// Ordered list whose elements are dehydrated one by one.
    List(Vec<Prop>),
    /// Persistent entity. Crosses the wire as a reference only.
    Record(Record),
    /// Application value handled by a registered custom synthesizer.
    Custom(Arc<dyn CustomProp>),
}

impl Prop {
    pub fn null() -> Self {
        Prop::Value(Value::Null)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Prop::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Prop]> {
        match self {
            Prop::List(items) => Some(items),
            _ => None,
        }
    }

    /// Downcast a custom value to its concrete type.
    pub fn downcast_custom<T: 'static>(&self) -> Option<&T> {
        match self {
            Prop::Custom(c) => c.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Human-readable category, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Prop::Value(Value::Null) => "null",
            Prop::Value(Value::Bool(_)) => "bool",
            Prop::Value(Value::Number(_)) => "number",
            Prop::Value(Value::String(_)) => "string",
            Prop::Value(Value::Array(_)) => "array",
            Prop::Value(Value::Object(_)) => "object",
            Prop::List(_) => "list",
            Prop::Record(_) => "record",
            Prop::Custom(c) => c.type_name(),
        }
    }

    /// Best-effort JSON view of the value, without any synthesizer.
    ///
    /// Used for template locals and for the lenient passthrough when no
    /// synthesizer claims a value.
    pub fn to_raw_json(&self) -> Value {
        match self {
            Prop::Value(v) => v.clone(),
            Prop::List(items) => Value::Array(items.iter().map(Prop::to_raw_json).collect()),
            Prop::Record(r) => r.to_json(),
            Prop::Custom(c) => c.to_raw_json(),
        }
    }
}

impl PartialEq for Prop {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Prop::Value(a), Prop::Value(b)) => a == b,
            (Prop::List(a), Prop::List(b)) => a == b,
            (Prop::Record(a), Prop::Record(b)) => a == b,
            (Prop::Custom(a), Prop::Custom(b)) => Arc::ptr_eq(a, b) || a.eq_prop(b.as_ref()),
            _ => false,
        }
    }
}

impl From<Value> for Prop {
    fn from(v: Value) -> Self {
        Prop::Value(v)
    }
}

impl From<i64> for Prop {
    fn from(v: i64) -> Self {
        Prop::Value(Value::from(v))
    }
}

impl From<bool> for Prop {
    fn from(v: bool) -> Self {
        Prop::Value(Value::Bool(v))
    }
}

impl From<&str> for Prop {
    fn from(v: &str) -> Self {
        Prop::Value(Value::String(v.to_string()))
    }
}

impl From<String> for Prop {
    fn from(v: String) -> Self {
        Prop::Value(Value::String(v))
    }
}

impl From<Record> for Prop {
    fn from(r: Record) -> Self {
        Prop::Record(r)
    }
}

impl From<Vec<Prop>> for Prop {
    fn from(items: Vec<Prop>) -> Self {
        Prop::List(items)
    }
}

/// Application-defined property value.
///
/// Implementors pair with a custom synthesizer that knows how to move the
/// value across the wire.
pub trait CustomProp: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;

    fn eq_prop(&self, other: &dyn CustomProp) -> bool;

    /// JSON emitted when no synthesizer claims the value.
    fn to_raw_json(&self) -> Value {
        Value::String(format!("{:?}", self))
    }
}

// ── Persistent entities ───────────────────────────────────────────

/// A persistent external entity, identified by model name + primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    pub model: String,
    pub key: Value,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(model: impl Into<String>, key: impl Into<Value>) -> Self {
        Self {
            model: model.into(),
            key: key.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Attributes as a JSON object, primary key included under `key`
    /// unless an attribute already uses that name.
    pub fn to_json(&self) -> Value {
        let mut obj = self.attributes.clone();
        obj.entry("key".to_string()).or_insert_with(|| self.key.clone());
        Value::Object(obj)
    }
}

// ── Snapshot ──────────────────────────────────────────────────────

/// Complete wire state of one component, plus its integrity stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub data: Map<String, Value>,
    pub memo: Map<String, Value>,
    #[serde(default)]
    pub checksum: String,
}

impl Snapshot {
    /// Unstamped snapshot; the checksum is filled in by `hashing::Checksum::stamp`.
    pub fn new(data: Map<String, Value>, memo: Map<String, Value>) -> Self {
        Self {
            data,
            memo,
            checksum: String::new(),
        }
    }

    pub fn memo_str(&self, key: &str) -> Option<&str> {
        self.memo.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.memo_str("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.memo_str("name")
    }

    pub fn path(&self) -> Option<&str> {
        self.memo_str("path")
    }
}

// ── Effects ───────────────────────────────────────────────────────

/// Outbound-only signals produced by one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Effects(pub Map<String, Value>);

impl Effects {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Re-rendered markup, present on update passes that rendered.
    pub fn html(&self) -> Option<&str> {
        self.get("html").and_then(Value::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
