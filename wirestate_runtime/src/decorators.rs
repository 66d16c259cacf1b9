//! Declarative behaviours attached to a component class.
//!
//! Decorators are built once at registration and shared between every
//! instance of the class. They hold no per-instance state: each hook
//! receives the current component through `HookCx`.

use std::any::Any;
use std::fmt;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use wirestate_kernel::domain::Prop;
use wirestate_kernel::path;

use crate::error::EngineError;
use crate::hooks::{CallFinisher, HookCx, RenderFinisher, ReturnEarly, UpdateFinisher};
use crate::view::ViewData;

#[async_trait]
pub trait Decorator: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    async fn boot(&self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn mount(
        &self,
        _cx: &mut HookCx<'_>,
        _params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn hydrate(
        &self,
        _cx: &mut HookCx<'_>,
        _memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn update(
        &self,
        _cx: &mut HookCx<'_>,
        _full_path: &str,
        _value: &Value,
    ) -> Result<Option<UpdateFinisher>, EngineError> {
        Ok(None)
    }

    async fn call(
        &self,
        _cx: &mut HookCx<'_>,
        _method: &str,
        _params: &[Value],
        _return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        Ok(None)
    }

    async fn render(
        &self,
        _cx: &mut HookCx<'_>,
        _view: &mut ViewData,
    ) -> Result<Option<RenderFinisher>, EngineError> {
        Ok(None)
    }

    async fn dehydrate(&self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }

    async fn destroy(&self, _cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        Ok(())
    }
}

macro_rules! impl_as_any {
    () => {
        fn as_any(&self) -> &dyn Any {
            self
        }
    };
}

// ── Page components ──────────────────────────────────────────────

/// Shares `title` into the view.
#[derive(Debug, Clone)]
pub struct Title(pub String);

impl Title {
    pub fn new(title: &str) -> Self {
        Self(title.to_string())
    }
}

#[async_trait]
impl Decorator for Title {
    impl_as_any!();

    async fn render(
        &self,
        _cx: &mut HookCx<'_>,
        view: &mut ViewData,
    ) -> Result<Option<RenderFinisher>, EngineError> {
        view.insert("title".to_string(), Value::String(self.0.clone()));
        Ok(None)
    }
}

/// Wraps the mounted markup in a layout template.
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    pub props: Map<String, Value>,
}

impl Layout {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            props: Map::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        self.props.insert(key.to_string(), value);
        self
    }

    /// `components.layouts.main` -> `components/layouts/main`.
    pub fn view_path(name: &str) -> String {
        name.replace('.', "/")
    }
}

#[async_trait]
impl Decorator for Layout {
    impl_as_any!();

    async fn boot(&self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        cx.component.state().store().push(
            "layout",
            json!({ "name": self.name, "props": self.props }),
            None,
        )
    }
}

// ── Properties ───────────────────────────────────────────────────

/// Exposes a server-derived value to the view under `name`.
///
/// Computed names are never client-writable: hydration skips them.
#[derive(Debug, Clone)]
pub struct Computed {
    pub name: String,
    pub method: String,
}

impl Computed {
    pub fn new(name: &str, method: &str) -> Self {
        Self {
            name: name.to_string(),
            method: method.to_string(),
        }
    }
}

#[async_trait]
impl Decorator for Computed {
    impl_as_any!();

    async fn render(
        &self,
        cx: &mut HookCx<'_>,
        view: &mut ViewData,
    ) -> Result<Option<RenderFinisher>, EngineError> {
        if let Some(value) = cx.component.computed(&self.method).await? {
            view.insert(self.name.clone(), value);
        }
        Ok(None)
    }
}

/// Rejects any client update that reaches `name`.
#[derive(Debug, Clone)]
pub struct Locked {
    pub name: String,
}

impl Locked {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Decorator for Locked {
    impl_as_any!();

    async fn update(
        &self,
        _cx: &mut HookCx<'_>,
        full_path: &str,
        _value: &Value,
    ) -> Result<Option<UpdateFinisher>, EngineError> {
        if path::root(full_path) == self.name {
            return Err(EngineError::LockedProperty(self.name.clone()));
        }
        Ok(None)
    }
}

/// Binds a property to the query string.
#[derive(Debug, Clone)]
pub struct Url {
    pub name: String,
    pub alias: Option<String>,
}

impl Url {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: None,
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    fn query_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[async_trait]
impl Decorator for Url {
    impl_as_any!();

    async fn mount(
        &self,
        cx: &mut HookCx<'_>,
        _params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let input = cx.request.input(self.query_key()).cloned();
        match input {
            Some(value) if !value.is_null() => {
                cx.component
                    .state_mut()
                    .props
                    .set(&self.name, Prop::Value(value));
            }
            _ => {}
        }
        Ok(())
    }

    async fn dehydrate(&self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        if !cx.context.mounting() {
            return Ok(());
        }
        cx.context.push_effect(
            "url",
            json!({
                "as": self.alias,
                "use": "replace",
                "alwaysShow": false,
                "except": null,
            }),
            Some(&self.name),
        );
        Ok(())
    }
}

/// Two-way binding between a parent's property and one of ours.
#[derive(Debug, Clone)]
pub struct Modelable {
    pub outer: String,
    pub inner: String,
}

impl Modelable {
    pub fn new(outer: &str, inner: &str) -> Self {
        Self {
            outer: outer.to_string(),
            inner: inner.to_string(),
        }
    }
}

#[async_trait]
impl Decorator for Modelable {
    impl_as_any!();

    async fn mount(
        &self,
        cx: &mut HookCx<'_>,
        _params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        cx.component.state().store().push(
            "bindings",
            json!({ "outer": self.outer, "inner": self.inner }),
            None,
        )
    }
}

// ── Events and rendering ─────────────────────────────────────────

/// Routes browser event `event` to component method `method`.
#[derive(Debug, Clone)]
pub struct On {
    pub event: String,
    pub method: String,
}

impl On {
    pub fn new(event: &str, method: &str) -> Self {
        Self {
            event: event.to_string(),
            method: method.to_string(),
        }
    }
}

#[async_trait]
impl Decorator for On {
    impl_as_any!();

    async fn boot(&self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        cx.component.state().listen(&self.event, &self.method)
    }
}

/// Method calls never re-render.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderless;

#[async_trait]
impl Decorator for Renderless {
    impl_as_any!();

    async fn call(
        &self,
        cx: &mut HookCx<'_>,
        _method: &str,
        _params: &[Value],
        _return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        cx.component.state().skip_render(None)?;
        Ok(None)
    }
}

/// Defers the real mount until the placeholder scrolls into view.
#[derive(Debug, Clone, Copy)]
pub struct Lazy {
    pub isolate: bool,
}

impl Default for Lazy {
    fn default() -> Self {
        Self { isolate: true }
    }
}

#[async_trait]
impl Decorator for Lazy {
    impl_as_any!();
}
