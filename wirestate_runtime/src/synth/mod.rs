//! Synthesizer registry.
//!
//! Converts live `Prop` values to and from the wire format. Plain JSON
//! passes through untouched; everything else becomes a tagged tuple
//! `[data, {"s": key, ..meta}]` produced by the first synthesizer whose
//! `matches` accepts the value. Composite synthesizers recurse through
//! `Children`, which extends the property path per element.

mod array;
mod model;
mod object;

pub use array::ArraySynth;
pub use model::ModelSynth;
pub use object::ObjectSynth;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use wirestate_kernel::domain::Prop;
use wirestate_kernel::invariants::{contains_synthetic_shape, is_synthetic_tuple, SYNTH_KEY};

use crate::entities::EntityStore;
use crate::error::EngineError;

/// Meta flag marking a tuple that wraps plain JSON (hydrates to `Prop::Value`).
pub const RAW_META: &str = "raw";

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Stable wire tag written to `meta.s`.
    fn key(&self) -> &'static str;

    fn matches(&self, prop: &Prop) -> bool;

    async fn dehydrate(
        &self,
        prop: &Prop,
        children: &Children<'_>,
    ) -> Result<(Value, Map<String, Value>), EngineError>;

    async fn hydrate(
        &self,
        data: Value,
        meta: &Map<String, Value>,
        children: &Children<'_>,
    ) -> Result<Prop, EngineError>;
}

/// Re-entrant callback handed to composite synthesizers.
pub struct Children<'a> {
    registry: &'a SynthRegistry,
    entities: &'a dyn EntityStore,
    path: &'a str,
}

impl<'a> Children<'a> {
    pub fn path(&self) -> &str {
        self.path
    }

    pub fn entities(&self) -> &dyn EntityStore {
        self.entities
    }

    pub async fn dehydrate(&self, key: &str, prop: &Prop) -> Result<Value, EngineError> {
        let path = format!("{}.{}", self.path, key);
        self.registry.dehydrate(prop, path, self.entities).await
    }

    pub async fn hydrate(&self, key: &str, value: Value) -> Result<Prop, EngineError> {
        let path = format!("{}.{}", self.path, key);
        self.registry.hydrate(value, path, self.entities).await
    }
}

/// Ordered synthesizer list. Immutable once the engine is built.
#[derive(Clone, Default)]
pub struct SynthRegistry {
    synths: Vec<Arc<dyn Synthesizer>>,
}

impl SynthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Array, object and model synthesizers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ArraySynth));
        registry.register(Arc::new(ObjectSynth));
        registry.register(Arc::new(ModelSynth));
        registry
    }

    pub fn register(&mut self, synth: Arc<dyn Synthesizer>) {
        self.synths.push(synth);
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.synths.iter().map(|s| s.key()).collect()
    }

    fn by_key(&self, key: &str) -> Option<&Arc<dyn Synthesizer>> {
        self.synths.iter().find(|s| s.key() == key)
    }

    fn matching(&self, prop: &Prop) -> Option<&Arc<dyn Synthesizer>> {
        self.synths.iter().find(|s| s.matches(prop))
    }

    pub fn dehydrate<'a>(
        &'a self,
        prop: &'a Prop,
        path: String,
        entities: &'a dyn EntityStore,
    ) -> BoxFuture<'a, Result<Value, EngineError>> {
        async move {
            if let Prop::Value(value) = prop {
                if !contains_synthetic_shape(value) {
                    return Ok(value.clone());
                }
            }

            let synth = self.matching(prop).ok_or_else(|| EngineError::UnsupportedType {
                path: path.clone(),
                type_name: prop.type_name().to_string(),
            })?;

            let children = Children {
                registry: self,
                entities,
                path: &path,
            };
            let (data, mut meta) = synth.dehydrate(prop, &children).await?;
            meta.insert(SYNTH_KEY.to_string(), Value::String(synth.key().to_string()));
            Ok(Value::Array(vec![data, Value::Object(meta)]))
        }
        .boxed()
    }

    pub fn hydrate<'a>(
        &'a self,
        value: Value,
        path: String,
        entities: &'a dyn EntityStore,
    ) -> BoxFuture<'a, Result<Prop, EngineError>> {
        async move {
            if !is_synthetic_tuple(&value) {
                return Ok(Prop::Value(value));
            }
            let (data, meta) = split_tuple(value)?;
            let key = meta
                .get(SYNTH_KEY)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let synth = self
                .by_key(&key)
                .ok_or(EngineError::UnknownSynthesizer(key))?;

            let children = Children {
                registry: self,
                entities,
                path: &path,
            };
            synth.hydrate(data, &meta, &children).await
        }
        .boxed()
    }
}

fn split_tuple(value: Value) -> Result<(Value, Map<String, Value>), EngineError> {
    match value {
        Value::Array(mut items) if items.len() == 2 => {
            let meta = items.pop();
            let data = items.pop();
            match (data, meta) {
                (Some(data), Some(Value::Object(meta))) => Ok((data, meta)),
                _ => Err(EngineError::UnknownSynthesizer(String::new())),
            }
        }
        _ => Err(EngineError::UnknownSynthesizer(String::new())),
    }
}

/// True when the tuple meta marks a wrapped plain-JSON value.
pub(crate) fn is_raw(meta: &Map<String, Value>) -> bool {
    meta.get(RAW_META).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn raw_meta() -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert(RAW_META.to_string(), Value::Bool(true));
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MemoryEntityStore;
    use futures::executor::block_on;
    use proptest::prelude::*;
    use serde_json::json;
    use wirestate_kernel::domain::{CustomProp, Record};

    fn roundtrip(registry: &SynthRegistry, entities: &MemoryEntityStore, prop: &Prop) -> Prop {
        block_on(async {
            let wire = registry.dehydrate(prop, "p".into(), entities).await.unwrap();
            registry.hydrate(wire, "p".into(), entities).await.unwrap()
        })
    }

    #[test]
    fn plain_json_passes_through() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let wire = block_on(registry.dehydrate(
            &Prop::Value(json!({"a": [1, 2], "b": "c"})),
            "p".into(),
            &entities,
        ))
        .unwrap();
        assert_eq!(wire, json!({"a": [1, 2], "b": "c"}));
    }

    #[test]
    fn lists_are_tagged_arr() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let list = Prop::List(vec![Prop::from(1), Prop::from("x")]);
        let wire = block_on(registry.dehydrate(&list, "p".into(), &entities)).unwrap();
        assert_eq!(wire, json!([[1, "x"], {"s": "arr"}]));
        assert_eq!(roundtrip(&registry, &entities, &list), list);
    }

    #[test]
    fn colliding_shapes_are_escaped() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let tricky = Prop::Value(json!({"pair": [1, {"s": "mdl"}]}));
        let wire = block_on(registry.dehydrate(&tricky, "p".into(), &entities)).unwrap();
        assert_eq!(
            wire,
            json!([{"pair": [[1, {"s": "mdl"}], {"raw": true, "s": "arr"}]}, {"raw": true, "s": "std"}])
        );
        assert_eq!(roundtrip(&registry, &entities, &tricky), tricky);
    }

    #[test]
    fn unknown_key_is_fatal() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let err = block_on(registry.hydrate(json!([1, {"s": "zzz"}]), "p".into(), &entities))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownSynthesizer(ref k) if k == "zzz"));
    }

    #[derive(Debug)]
    struct Opaque;

    impl CustomProp for Opaque {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn type_name(&self) -> &'static str {
            "opaque"
        }

        fn eq_prop(&self, other: &dyn CustomProp) -> bool {
            other.as_any().is::<Opaque>()
        }
    }

    #[test]
    fn unmatched_custom_value_is_unsupported() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let prop = Prop::List(vec![Prop::Custom(Arc::new(Opaque))]);
        let err = block_on(registry.dehydrate(&prop, "items".into(), &entities)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnsupportedType { ref path, ref type_name } if path == "items.0" && type_name == "opaque"
        ));
    }

    #[test]
    fn records_roundtrip_through_entity_store() {
        let registry = SynthRegistry::with_defaults();
        let post = Record::new("Post", 3).with_attribute("title", "hi");
        let entities = MemoryEntityStore::new().with_record(post.clone());
        let prop = Prop::Record(post);
        assert_eq!(roundtrip(&registry, &entities, &prop), prop);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner.clone(), 0..5)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
                (inner, "[a-z]{1,4}").prop_map(|(v, s)| json!([v, {"s": s}])),
            ]
        })
    }

    fn arb_prop() -> impl Strategy<Value = Prop> {
        let leaf = arb_json().prop_map(Prop::Value);
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Prop::List)
        })
    }

    proptest! {
        #[test]
        fn hydrate_inverts_dehydrate(prop in arb_prop()) {
            let registry = SynthRegistry::with_defaults();
            let entities = MemoryEntityStore::new();
            prop_assert_eq!(roundtrip(&registry, &entities, &prop), prop);
        }
    }
}
