//! Hook pipeline.
//!
//! A feature is a `ComponentHook` constructed fresh for one component for
//! one pass. The pipeline fans each lifecycle event out to every feature
//! in registration order. `update`, `render` and `call` may hand back a
//! finisher; finishers run only after every feature has seen the event.

use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::context::ComponentContext;

use crate::app::App;
use crate::component::Component;
use crate::error::EngineError;
use crate::request::RequestScope;
use crate::view::ViewData;

/// Runs after the new value has been assigned.
pub type UpdateFinisher = Box<dyn FnOnce(&Value) -> Result<(), EngineError> + Send>;

/// Runs on the rendered HTML; may replace it in place.
pub type RenderFinisher = Box<dyn FnOnce(&mut String) -> Result<(), EngineError> + Send>;

/// Runs with the method's return value.
pub type CallFinisher = Box<dyn FnOnce(&Value) -> Result<(), EngineError> + Send>;

/// Constructor registered once at startup, invoked per component per pass.
pub type FeatureFactory = fn() -> Box<dyn ComponentHook>;

/// Everything a hook may touch while handling one event.
pub struct HookCx<'a> {
    pub component: &'a mut dyn Component,
    pub context: &'a mut ComponentContext,
    pub app: &'a App,
    pub request: &'a RequestScope,
}

/// Short-circuit slot for a method call.
///
/// Once resolved, the component's own method is not invoked and the
/// resolved value is the call's result.
#[derive(Debug, Default)]
pub struct ReturnEarly {
    value: Option<Value>,
}

impl ReturnEarly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn take(&mut self) -> Option<Value> {
        self.value.take()
    }
}

#[async_trait]
pub trait ComponentHook: Send {
    async fn boot(&mut self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn mount(
        &mut self,
        _cx: &mut HookCx<'_>,
        _params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn hydrate(
        &mut self,
        _cx: &mut HookCx<'_>,
        _memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn update(
        &mut self,
        _cx: &mut HookCx<'_>,
        _property: &str,
        _full_path: &str,
        _value: &Value,
    ) -> Result<Option<UpdateFinisher>, EngineError> {
        Ok(None)
    }

    async fn call(
        &mut self,
        _cx: &mut HookCx<'_>,
        _method: &str,
        _params: &[Value],
        _return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        Ok(None)
    }

    async fn render(
        &mut self,
        _cx: &mut HookCx<'_>,
        _view: &mut ViewData,
    ) -> Result<Option<RenderFinisher>, EngineError> {
        Ok(None)
    }

    async fn dehydrate(&mut self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn destroy(&mut self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    /// Return `true` to mark the error handled.
    async fn exception(
        &mut self,
        _cx: &mut HookCx<'_>,
        _error: &EngineError,
    ) -> Result<bool, EngineError> {
        Ok(false)
    }
}

// ── Pipeline ─────────────────────────────────────────────────────

pub struct Pipeline {
    hooks: Vec<Box<dyn ComponentHook>>,
}

impl Pipeline {
    /// Fresh feature instances for one component.
    pub fn new(factories: &[FeatureFactory]) -> Self {
        Self {
            hooks: factories.iter().map(|make| make()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Boot then mount, per feature.
    pub async fn mount(
        &mut self,
        cx: &mut HookCx<'_>,
        params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        for hook in &mut self.hooks {
            hook.boot(cx).await?;
            hook.mount(cx, params).await?;
        }
        Ok(())
    }

    /// Boot then hydrate, per feature.
    pub async fn hydrate(
        &mut self,
        cx: &mut HookCx<'_>,
        memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        for hook in &mut self.hooks {
            hook.boot(cx).await?;
            hook.hydrate(cx, memo).await?;
        }
        Ok(())
    }

    pub async fn update(
        &mut self,
        cx: &mut HookCx<'_>,
        property: &str,
        full_path: &str,
        value: &Value,
    ) -> Result<Vec<UpdateFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for hook in &mut self.hooks {
            if let Some(finish) = hook.update(cx, property, full_path, value).await? {
                finishers.push(finish);
            }
        }
        Ok(finishers)
    }

    pub async fn call(
        &mut self,
        cx: &mut HookCx<'_>,
        method: &str,
        params: &[Value],
        return_early: &mut ReturnEarly,
    ) -> Result<Vec<CallFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for hook in &mut self.hooks {
            if let Some(finish) = hook.call(cx, method, params, return_early).await? {
                finishers.push(finish);
            }
        }
        Ok(finishers)
    }

    pub async fn render(
        &mut self,
        cx: &mut HookCx<'_>,
        view: &mut ViewData,
    ) -> Result<Vec<RenderFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for hook in &mut self.hooks {
            if let Some(finish) = hook.render(cx, view).await? {
                finishers.push(finish);
            }
        }
        Ok(finishers)
    }

    pub async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        for hook in &mut self.hooks {
            hook.dehydrate(cx).await?;
        }
        Ok(())
    }

    pub async fn destroy(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        for hook in &mut self.hooks {
            hook.destroy(cx).await?;
        }
        Ok(())
    }

    /// True when any feature handled the error.
    pub async fn exception(
        &mut self,
        cx: &mut HookCx<'_>,
        error: &EngineError,
    ) -> Result<bool, EngineError> {
        let mut handled = false;
        for hook in &mut self.hooks {
            if hook.exception(cx, error).await? {
                handled = true;
            }
        }
        Ok(handled)
    }
}

pub fn finish_update(finishers: Vec<UpdateFinisher>, value: &Value) -> Result<(), EngineError> {
    finishers.into_iter().try_for_each(|finish| finish(value))
}

pub fn finish_render(finishers: Vec<RenderFinisher>, html: &mut String) -> Result<(), EngineError> {
    finishers.into_iter().try_for_each(|finish| finish(html))
}

pub fn finish_call(finishers: Vec<CallFinisher>, returned: &Value) -> Result<(), EngineError> {
    finishers.into_iter().try_for_each(|finish| finish(returned))
}
