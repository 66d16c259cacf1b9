/// Wirestate — Component Context
///
/// Per-pass accumulator for one component: outbound effects, memo
/// additions and whether the pass is the initial mount.

use serde_json::{Map, Value};

use crate::domain::Effects;
use crate::store::push_value;

#[derive(Debug, Default)]
pub struct ComponentContext {
    effects: Map<String, Value>,
    memo: Map<String, Value>,
    mounting: bool,
}

impl ComponentContext {
    pub fn new(mounting: bool) -> Self {
        Self {
            effects: Map::new(),
            memo: Map::new(),
            mounting,
        }
    }

    pub fn mounting(&self) -> bool {
        self.mounting
    }

    pub fn add_effect(&mut self, key: &str, value: Value) {
        self.effects.insert(key.to_string(), value);
    }

    /// Append to (or index into) the effect list/map under `key`.
    pub fn push_effect(&mut self, key: &str, value: Value, index_key: Option<&str>) {
        let slot = self.effects.entry(key.to_string()).or_insert(Value::Null);
        push_value(slot, value, index_key);
    }

    pub fn add_memo(&mut self, key: &str, value: Value) {
        self.memo.insert(key.to_string(), value);
    }

    pub fn push_memo(&mut self, key: &str, value: Value, index_key: Option<&str>) {
        let slot = self.memo.entry(key.to_string()).or_insert(Value::Null);
        push_value(slot, value, index_key);
    }

    pub fn effects(&self) -> &Map<String, Value> {
        &self.effects
    }

    pub fn memo(&self) -> &Map<String, Value> {
        &self.memo
    }

    pub fn into_parts(self) -> (Effects, Map<String, Value>) {
        (Effects(self.effects), self.memo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_overwrites_push_accumulates() {
        let mut ctx = ComponentContext::new(true);
        assert!(ctx.mounting());

        ctx.add_effect("html", json!("<a>"));
        ctx.add_effect("html", json!("<b>"));
        ctx.push_effect("dispatches", json!({"name": "a"}), None);
        ctx.push_effect("dispatches", json!({"name": "b"}), None);
        ctx.push_memo("scripts", json!("k"), Some("k"));

        let (effects, memo) = ctx.into_parts();
        assert_eq!(effects.html(), Some("<b>"));
        assert_eq!(
            effects.get("dispatches"),
            Some(&json!([{"name": "a"}, {"name": "b"}]))
        );
        assert_eq!(memo.get("scripts"), Some(&json!({"k": "k"})));
    }
}
