use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::domain::Prop;

use super::{is_raw, raw_meta, Children, Synthesizer};
use crate::error::EngineError;

/// Element-wise list synthesizer (`arr`).
///
/// Also wraps plain JSON arrays whose contents collide with the tuple
/// shape; those carry `raw: true` and hydrate back to `Prop::Value`.
pub struct ArraySynth;

#[async_trait]
impl Synthesizer for ArraySynth {
    fn key(&self) -> &'static str {
        "arr"
    }

    fn matches(&self, prop: &Prop) -> bool {
        matches!(prop, Prop::List(_) | Prop::Value(Value::Array(_)))
    }

    async fn dehydrate(
        &self,
        prop: &Prop,
        children: &Children<'_>,
    ) -> Result<(Value, Map<String, Value>), EngineError> {
        match prop {
            Prop::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(children.dehydrate(&i.to_string(), item).await?);
                }
                Ok((Value::Array(out), Map::new()))
            }
            Prop::Value(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let child = Prop::Value(item.clone());
                    out.push(children.dehydrate(&i.to_string(), &child).await?);
                }
                Ok((Value::Array(out), raw_meta()))
            }
            other => Err(EngineError::UnsupportedType {
                path: children.path().to_string(),
                type_name: other.type_name().to_string(),
            }),
        }
    }

    async fn hydrate(
        &self,
        data: Value,
        meta: &Map<String, Value>,
        children: &Children<'_>,
    ) -> Result<Prop, EngineError> {
        let items = match data {
            Value::Array(items) => items,
            other => return Ok(Prop::Value(other)),
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            out.push(children.hydrate(&i.to_string(), item).await?);
        }

        if is_raw(meta) {
            Ok(Prop::Value(Value::Array(
                out.iter().map(Prop::to_raw_json).collect(),
            )))
        } else {
            Ok(Prop::List(out))
        }
    }
}
