//! Execution-scoped pass carrier.
//!
//! Every mount/update pass runs inside its own task-local scope holding a
//! fresh `EphemeralStore`. Concurrent passes on other tasks see their own
//! scope; code running outside any pass gets `EngineError::OutsidePass`.

use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use wirestate_kernel::store::{EphemeralStore, InstanceKey};

use crate::config::WireConfig;
use crate::error::EngineError;

pub struct PassScope {
    id: Uuid,
    store: RefCell<EphemeralStore>,
    config: Arc<WireConfig>,
}

impl PassScope {
    pub fn new(config: Arc<WireConfig>) -> Self {
        Self {
            id: Uuid::new_v4(),
            store: RefCell::new(EphemeralStore::new()),
            config,
        }
    }
}

tokio::task_local! {
    static PASS: PassScope;
}

/// Run `fut` inside a fresh pass scope. The store is dropped with it.
pub async fn run<F: Future>(config: Arc<WireConfig>, fut: F) -> F::Output {
    PASS.scope(PassScope::new(config), fut).await
}

/// Borrow the current pass's store. Must not be re-entered from `f`.
pub fn with_store<R>(f: impl FnOnce(&mut EphemeralStore) -> R) -> Result<R, EngineError> {
    PASS.try_with(|scope| f(&mut scope.store.borrow_mut()))
        .map_err(|_| EngineError::OutsidePass)
}

pub fn config() -> Result<Arc<WireConfig>, EngineError> {
    PASS.try_with(|scope| Arc::clone(&scope.config))
        .map_err(|_| EngineError::OutsidePass)
}

pub fn pass_id() -> Result<Uuid, EngineError> {
    PASS.try_with(|scope| scope.id).map_err(|_| EngineError::OutsidePass)
}

/// Store accessor bound to one component instance.
pub fn store(component: InstanceKey) -> StoreHandle {
    StoreHandle { component }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreHandle {
    component: InstanceKey,
}

impl StoreHandle {
    pub fn push(&self, key: &str, value: Value, index_key: Option<&str>) -> Result<(), EngineError> {
        with_store(|s| s.push(self.component, key, value, index_key))
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), EngineError> {
        with_store(|s| s.set(self.component, key, value))
    }

    pub fn get(&self, key: &str) -> Result<Value, EngineError> {
        with_store(|s| s.get(self.component, key))
    }

    pub fn has(&self, key: &str) -> Result<bool, EngineError> {
        with_store(|s| s.has(self.component, key))
    }

    pub fn first(&self, key: &str) -> Result<Option<Value>, EngineError> {
        with_store(|s| s.first(self.component, key))
    }

    /// Flag-style read: present and neither `false` nor `null`.
    pub fn is_set(&self, key: &str) -> Result<bool, EngineError> {
        Ok(matches!(self.first(key)?, Some(v) if !v.is_null() && v != Value::Bool(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn access_outside_a_pass_fails() {
        let handle = store(InstanceKey::next());
        assert!(matches!(handle.get("x"), Err(EngineError::OutsidePass)));
        assert!(matches!(config(), Err(EngineError::OutsidePass)));
    }

    #[tokio::test]
    async fn each_pass_starts_empty() {
        let config = Arc::new(WireConfig::default());
        let key = InstanceKey::next();

        run(config.clone(), async {
            store(key).set("skipRender", json!(true)).unwrap();
            assert!(store(key).is_set("skipRender").unwrap());
        })
        .await;

        run(config, async {
            assert!(!store(key).has("skipRender").unwrap());
            assert_eq!(store(key).get("skipRender").unwrap(), json!([]));
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_passes_are_isolated() {
        let config = Arc::new(WireConfig::default());
        let key = InstanceKey::next();

        let a = run(config.clone(), async {
            store(key).push("js", json!("a()"), None).unwrap();
            tokio::task::yield_now().await;
            store(key).get("js").unwrap()
        });
        let b = run(config.clone(), async {
            store(key).push("js", json!("b()"), None).unwrap();
            tokio::task::yield_now().await;
            store(key).get("js").unwrap()
        });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a, json!(["a()"]));
        assert_eq!(b, json!(["b()"]));
    }

    #[tokio::test]
    async fn pass_ids_differ() {
        let config = Arc::new(WireConfig::default());
        let first = run(config.clone(), async { pass_id().unwrap() }).await;
        let second = run(config, async { pass_id().unwrap() }).await;
        assert_ne!(first, second);
    }
}
