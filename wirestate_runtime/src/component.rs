//! Components: state, lifecycle trait and the name registry.
//!
//! A component's public property bag lives in `ComponentState::props`;
//! that is exactly what gets dehydrated into `snapshot.data`. Anything
//! else a component struct holds never leaves the server.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use wirestate_kernel::domain::Prop;
use wirestate_kernel::hashing::content_hash;
use wirestate_kernel::path::dash_case;
use wirestate_kernel::store::InstanceKey;

use crate::decorators::Decorator;
use crate::error::EngineError;
use crate::scope::{self, StoreHandle};
use crate::view::View;

// ── Property bag ─────────────────────────────────────────────────

/// Ordered name -> value map of a component's public properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, Prop)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Prop>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace, keeping the original position on replace.
    pub fn set(&mut self, name: &str, value: impl Into<Prop>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Prop> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Prop> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw JSON of every property, for template locals.
    pub fn to_locals(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(n, p)| (n.clone(), p.to_raw_json()))
            .collect()
    }
}

// ── Per-instance state ───────────────────────────────────────────

pub struct ComponentState {
    key: InstanceKey,
    id: String,
    name: String,
    view_path: String,
    pub props: Properties,
    decorators: Vec<Arc<dyn Decorator>>,
}

impl fmt::Debug for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentState")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("props", &self.props)
            .field("decorators", &self.decorators.len())
            .finish()
    }
}

impl ComponentState {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        view_path: impl Into<String>,
        decorators: Vec<Arc<dyn Decorator>>,
    ) -> Self {
        Self {
            key: InstanceKey::next(),
            id: id.into(),
            name: name.into(),
            view_path: view_path.into(),
            props: Properties::new(),
            decorators,
        }
    }

    pub fn key(&self) -> InstanceKey {
        self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn view_path(&self) -> &str {
        &self.view_path
    }

    pub fn decorators(&self) -> &[Arc<dyn Decorator>] {
        &self.decorators
    }

    pub fn add_decorator(&mut self, decorator: Arc<dyn Decorator>) {
        self.decorators.push(decorator);
    }

    /// First attached decorator of type `T`.
    pub fn decorator<T: Decorator + 'static>(&self) -> Option<&T> {
        self.decorators
            .iter()
            .find_map(|d| d.as_any().downcast_ref::<T>())
    }

    pub fn has_decorator<T: Decorator + 'static>(&self) -> bool {
        self.decorator::<T>().is_some()
    }

    /// This instance's slice of the pass store.
    pub fn store(&self) -> StoreHandle {
        scope::store(self.key)
    }

    // -- pass-scoped helpers ---------------------------------------

    /// Queue a browser event. `to` names a target component.
    pub fn dispatch(&self, name: &str, params: Value, to: Option<&str>) -> Result<(), EngineError> {
        self.store().push(
            "dispatched",
            json!({ "name": name, "params": params, "to": to }),
            None,
        )
    }

    /// Register a listener at runtime, in addition to the declared ones.
    pub fn listen(&self, event: &str, method: &str) -> Result<(), EngineError> {
        self.store()
            .push("listeners", json!({ "name": event, "method": method }), None)
    }

    /// Redirect the browser. Skips the render unless configured otherwise.
    pub fn redirect(&self, url: &str, navigate: bool) -> Result<(), EngineError> {
        let store = self.store();
        store.push("redirect", Value::String(url.to_string()), None)?;
        if navigate {
            store.push("redirectUsingNavigate", Value::Bool(true), None)?;
        }
        if !scope::config()?.render_on_redirect {
            self.skip_render(None)?;
        }
        Ok(())
    }

    /// Evaluate a JavaScript expression on the client after this response.
    pub fn js(&self, expression: &str) -> Result<(), EngineError> {
        self.store()
            .push("js", Value::String(expression.to_string()), None)
    }

    /// Skip this pass's render, optionally substituting `html`.
    pub fn skip_render(&self, html: Option<&str>) -> Result<(), EngineError> {
        let value = match html {
            Some(html) => Value::String(html.to_string()),
            None => Value::Bool(true),
        };
        self.store().set("skipRender", value)
    }

    pub fn skip_mount(&self) -> Result<(), EngineError> {
        self.store().set("skipMount", Value::Bool(true))
    }

    /// Component-scoped script, sent once per component lifetime.
    pub fn script(&self, markup: &str) -> Result<(), EngineError> {
        self.store()
            .push("scripts", Value::String(markup.to_string()), Some(&asset_key(markup)))
    }

    /// Page-level asset, injected once per page.
    pub fn asset(&self, markup: &str) -> Result<(), EngineError> {
        self.store()
            .push("assets", Value::String(markup.to_string()), Some(&asset_key(markup)))
    }
}

/// Content-derived key, so identical markup dedupes across renders.
fn asset_key(markup: &str) -> String {
    content_hash(markup.as_bytes())[..20].to_string()
}

// ── Mount arguments ──────────────────────────────────────────────

/// How a mount parameter is resolved before `mount` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    /// Passed through as JSON.
    Value,
    /// Looked up as an entity of this model by the parameter's value.
    Entity { model: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountBinding {
    pub name: String,
    pub kind: BindingKind,
}

impl MountBinding {
    pub fn value(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BindingKind::Value,
        }
    }

    pub fn entity(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: BindingKind::Entity {
                model: model.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MountArgs {
    pub params: Map<String, Value>,
    /// Declared bindings, resolved, in declaration order.
    pub resolved: Vec<(String, Prop)>,
}

impl MountArgs {
    pub fn resolved(&self, name: &str) -> Option<&Prop> {
        self.resolved.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }
}

// ── Lifecycle trait ──────────────────────────────────────────────

#[async_trait]
pub trait Component: Send + Sync + 'static {
    fn state(&self) -> &ComponentState;

    fn state_mut(&mut self) -> &mut ComponentState;

    /// Declared listeners as `(event, method)` pairs.
    fn listeners(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn mount_bindings(&self) -> Vec<MountBinding> {
        Vec::new()
    }

    /// Default: assign every resolved binding and every parameter that
    /// names a declared property.
    async fn mount(&mut self, args: MountArgs) -> Result<(), EngineError> {
        let props = &mut self.state_mut().props;
        for (name, value) in &args.params {
            if props.contains(name) {
                props.set(name, Prop::Value(value.clone()));
            }
        }
        for (name, prop) in args.resolved {
            if props.contains(&name) {
                props.set(&name, prop);
            }
        }
        Ok(())
    }

    async fn render(&self, view: &View<'_>) -> Result<String, EngineError> {
        view.render_default().await
    }

    /// Markup shown while a lazy mount is pending.
    async fn placeholder(&self, _params: &Map<String, Value>) -> Result<Option<String>, EngineError> {
        Ok(None)
    }

    /// Public action dispatch.
    async fn call(&mut self, method: &str, _params: Vec<Value>) -> Result<Value, EngineError> {
        Err(EngineError::MethodNotFound {
            component: self.state().name().to_string(),
            method: method.to_string(),
        })
    }

    /// Value of a computed property backed by `method`.
    async fn computed(&self, _method: &str) -> Result<Option<Value>, EngineError> {
        Ok(None)
    }

    async fn updating(&mut self, _property: &str, _value: &Value) -> Result<(), EngineError> {
        Ok(())
    }

    async fn updated(&mut self, _property: &str, _value: &Value) -> Result<(), EngineError> {
        Ok(())
    }

    /// Named per-property hooks: `updating<Prop>` / `updated<Prop>`.
    async fn on_hook(&mut self, _hook: &str, _value: &Value) -> Result<(), EngineError> {
        Ok(())
    }
}

// ── Registry ─────────────────────────────────────────────────────

pub type ComponentFactory = Arc<dyn Fn(ComponentState) -> Box<dyn Component> + Send + Sync>;

/// A registered component: constructor plus class-level decorators.
#[derive(Clone)]
pub struct ComponentClass {
    factory: ComponentFactory,
    decorators: Vec<Arc<dyn Decorator>>,
}

impl ComponentClass {
    pub fn decorate(&mut self, decorator: impl Decorator + 'static) -> &mut Self {
        self.decorators.push(Arc::new(decorator));
        self
    }
}

#[derive(Clone, Default)]
pub struct ComponentRegistry {
    classes: HashMap<String, ComponentClass>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> &mut ComponentClass
    where
        F: Fn(ComponentState) -> Box<dyn Component> + Send + Sync + 'static,
    {
        let class = ComponentClass {
            factory: Arc::new(factory),
            decorators: Vec::new(),
        };
        match self.classes.entry(name.to_string()) {
            Entry::Occupied(mut slot) => {
                slot.insert(class);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(class),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a fresh instance. `id` is reused on update, new on mount.
    pub fn instantiate(
        &self,
        name: &str,
        id: Option<&str>,
        view_prefix: &str,
    ) -> Result<Box<dyn Component>, EngineError> {
        let class = self
            .classes
            .get(name)
            .ok_or_else(|| EngineError::ComponentNotFound(name.to_string()))?;

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let state = ComponentState::new(id, name, view_path(view_prefix, name), class.decorators.clone());
        Ok((class.factory)(state))
    }
}

/// `admin.UserList` -> `<prefix>/admin/user-list`.
pub fn view_path(prefix: &str, name: &str) -> String {
    let segments: Vec<String> = name.split('.').map(dash_case).collect();
    format!("{}/{}", prefix, segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare {
        state: ComponentState,
    }

    #[async_trait]
    impl Component for Bare {
        fn state(&self) -> &ComponentState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ComponentState {
            &mut self.state
        }
    }

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register("admin.UserList", |mut state| {
            state.props.set("page", 1i64);
            Box::new(Bare { state })
        });
        registry
    }

    #[test]
    fn properties_keep_insertion_order_on_replace() {
        let mut props = Properties::new().with("a", 1i64).with("b", 2i64);
        props.set("a", 10i64);
        let names: Vec<&str> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(props.get("a").and_then(Prop::as_i64), Some(10));
    }

    #[test]
    fn instantiate_assigns_fresh_ids_and_view_path() {
        let registry = registry();
        let a = registry.instantiate("admin.UserList", None, "wirestate").unwrap();
        let b = registry.instantiate("admin.UserList", None, "wirestate").unwrap();
        assert_ne!(a.state().id(), b.state().id());
        assert_ne!(a.state().key(), b.state().key());
        assert_eq!(a.state().view_path(), "wirestate/admin/user-list");
        assert_eq!(a.state().props.get("page").and_then(Prop::as_i64), Some(1));

        let c = registry
            .instantiate("admin.UserList", Some("kept"), "wirestate")
            .unwrap();
        assert_eq!(c.state().id(), "kept");
    }

    #[test]
    fn unknown_component_is_not_found() {
        assert!(matches!(
            registry().instantiate("nope", None, "wirestate"),
            Err(EngineError::ComponentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn default_mount_assigns_declared_params_only() {
        let mut component = registry()
            .instantiate("admin.UserList", None, "wirestate")
            .unwrap();
        let mut params = Map::new();
        params.insert("page".into(), json!(4));
        params.insert("stray".into(), json!(true));
        component
            .mount(MountArgs {
                params,
                resolved: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(component.state().props.get("page").and_then(Prop::as_i64), Some(4));
        assert!(!component.state().props.contains("stray"));
    }
}
