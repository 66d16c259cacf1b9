use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::domain::Prop;

use super::{raw_meta, Children, Synthesizer};
use crate::error::EngineError;

/// Escapes plain JSON objects that contain a tuple-shaped value (`std`).
pub struct ObjectSynth;

#[async_trait]
impl Synthesizer for ObjectSynth {
    fn key(&self) -> &'static str {
        "std"
    }

    fn matches(&self, prop: &Prop) -> bool {
        matches!(prop, Prop::Value(Value::Object(_)))
    }

    async fn dehydrate(
        &self,
        prop: &Prop,
        children: &Children<'_>,
    ) -> Result<(Value, Map<String, Value>), EngineError> {
        let Prop::Value(Value::Object(entries)) = prop else {
            return Err(EngineError::UnsupportedType {
                path: children.path().to_string(),
                type_name: prop.type_name().to_string(),
            });
        };

        let mut out = Map::new();
        for (key, value) in entries {
            let child = Prop::Value(value.clone());
            out.insert(key.clone(), children.dehydrate(key, &child).await?);
        }
        Ok((Value::Object(out), raw_meta()))
    }

    async fn hydrate(
        &self,
        data: Value,
        _meta: &Map<String, Value>,
        children: &Children<'_>,
    ) -> Result<Prop, EngineError> {
        let entries = match data {
            Value::Object(entries) => entries,
            other => return Ok(Prop::Value(other)),
        };

        let mut out = Map::new();
        for (key, value) in entries {
            let child = children.hydrate(&key, value).await?;
            out.insert(key, child.to_raw_json());
        }
        Ok(Prop::Value(Value::Object(out)))
    }
}
