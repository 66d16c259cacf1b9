use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::domain::Prop;

use super::{Children, Synthesizer};
use crate::error::EngineError;

/// Persistent entities travel as `{key, model}` references (`mdl`).
///
/// Hydration re-fetches the record; a record deleted since the snapshot
/// was issued hydrates to null.
pub struct ModelSynth;

#[async_trait]
impl Synthesizer for ModelSynth {
    fn key(&self) -> &'static str {
        "mdl"
    }

    fn matches(&self, prop: &Prop) -> bool {
        matches!(prop, Prop::Record(_))
    }

    async fn dehydrate(
        &self,
        prop: &Prop,
        children: &Children<'_>,
    ) -> Result<(Value, Map<String, Value>), EngineError> {
        let Prop::Record(record) = prop else {
            return Err(EngineError::UnsupportedType {
                path: children.path().to_string(),
                type_name: prop.type_name().to_string(),
            });
        };

        let mut meta = Map::new();
        meta.insert("key".to_string(), record.key.clone());
        meta.insert("model".to_string(), Value::String(record.model.clone()));
        Ok((Value::Null, meta))
    }

    async fn hydrate(
        &self,
        _data: Value,
        meta: &Map<String, Value>,
        children: &Children<'_>,
    ) -> Result<Prop, EngineError> {
        let model = meta.get("model").and_then(Value::as_str).unwrap_or_default();
        let key = meta.get("key").cloned().unwrap_or(Value::Null);

        match children.entities().find(model, &key).await? {
            Some(record) => Ok(Prop::Record(record)),
            None => {
                tracing::debug!(path = children.path(), model, "referenced record no longer exists");
                Ok(Prop::null())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::SynthRegistry;
    use crate::entities::MemoryEntityStore;
    use futures::executor::block_on;
    use serde_json::json;
    use wirestate_kernel::domain::{Prop, Record};

    #[test]
    fn only_a_reference_crosses_the_wire() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let prop = Prop::Record(Record::new("Post", 9).with_attribute("body", "long text"));
        let wire = block_on(registry.dehydrate(&prop, "post".into(), &entities)).unwrap();
        assert_eq!(wire, json!([null, {"key": 9, "model": "Post", "s": "mdl"}]));
    }

    #[test]
    fn missing_record_hydrates_to_null() {
        let registry = SynthRegistry::with_defaults();
        let entities = MemoryEntityStore::new();
        let prop = block_on(registry.hydrate(
            json!([null, {"key": 9, "model": "Post", "s": "mdl"}]),
            "post".into(),
            &entities,
        ))
        .unwrap();
        assert_eq!(prop, Prop::null());
    }
}
