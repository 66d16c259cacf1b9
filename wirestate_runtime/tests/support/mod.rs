//! Shared fixtures: a handful of components exercising each feature, the
//! templates they render, and helpers to read a mounted root element.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use wirestate_kernel::domain::{Prop, Record, Snapshot};
use wirestate_runtime::component::{MountBinding, Properties};
use wirestate_runtime::config::WireConfig;
use wirestate_runtime::decorators::{Computed, Lazy, Locked, Modelable, On, Renderless, Title, Url};
use wirestate_runtime::entities::MemoryEntityStore;
use wirestate_runtime::guard::RouteGuard;
use wirestate_runtime::view::{TemplateRenderer, View};
use wirestate_runtime::{App, Component, ComponentRegistry, ComponentState, EngineError, ValidationErrors, WireEngine};

pub const APP_KEY: &str = "integration-test-key";

// ── Components ───────────────────────────────────────────────────

pub struct Counter {
    state: ComponentState,
}

impl Counter {
    fn count(&self) -> i64 {
        self.state.props.get("count").and_then(Prop::as_i64).unwrap_or(0)
    }
}

#[async_trait]
impl Component for Counter {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, EngineError> {
        match method {
            "increment" => {
                let next = self.count() + 1;
                self.state.props.set("count", next);
                Ok(json!(next))
            }
            "add" => {
                let by = params.first().and_then(Value::as_i64).unwrap_or(1);
                let next = self.count() + by;
                self.state.props.set("count", next);
                Ok(json!(next))
            }
            "validate" => {
                if self.count() < 0 {
                    return Err(ValidationErrors::new()
                        .with("count", "must not be negative")
                        .into());
                }
                Ok(Value::Null)
            }
            "notify" => {
                self.state
                    .dispatch("counted", json!({ "count": self.count() }), None)?;
                Ok(Value::Null)
            }
            "finish" => {
                self.state.redirect("/done", true)?;
                Ok(Value::Null)
            }
            "celebrate" => {
                self.state.js("confetti()")?;
                Ok(Value::Null)
            }
            "explode" => Err(EngineError::component("boom")),
            other => Err(EngineError::MethodNotFound {
                component: self.state.name().to_string(),
                method: other.to_string(),
            }),
        }
    }

    async fn computed(&self, method: &str) -> Result<Option<Value>, EngineError> {
        Ok(match method {
            "doubled" => Some(json!(self.count() * 2)),
            _ => None,
        })
    }

    async fn on_hook(&mut self, hook: &str, value: &Value) -> Result<(), EngineError> {
        if hook == "updatedCount" && value.as_i64().unwrap_or(0) > 1000 {
            self.state.props.set("count", 1000i64);
        }
        Ok(())
    }
}

pub struct Inbox {
    state: ComponentState,
}

#[async_trait]
impl Component for Inbox {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn listeners(&self) -> Vec<(String, String)> {
        vec![("message-sent".to_string(), "bump".to_string())]
    }

    async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value, EngineError> {
        let unread = self.state.props.get("unread").and_then(Prop::as_i64).unwrap_or(0);
        match method {
            "bump" => {
                let by = params
                    .first()
                    .and_then(|args| args.get("amount"))
                    .and_then(Value::as_i64)
                    .unwrap_or(1);
                self.state.props.set("unread", unread + by);
            }
            "reset" => self.state.props.set("unread", 0i64),
            other => {
                return Err(EngineError::MethodNotFound {
                    component: "inbox".into(),
                    method: other.into(),
                })
            }
        }
        Ok(Value::Null)
    }
}

pub struct Report {
    state: ComponentState,
}

#[async_trait]
impl Component for Report {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    async fn mount(&mut self, args: wirestate_runtime::component::MountArgs) -> Result<(), EngineError> {
        let rows = args.params.get("rows").and_then(Value::as_i64).unwrap_or(0);
        self.state.props.set("rows", rows);
        self.state.props.set("mounted", true);
        Ok(())
    }

    async fn placeholder(&self, _params: &Map<String, Value>) -> Result<Option<String>, EngineError> {
        Ok(Some("<p class=\"skeleton\">Loading…</p>".to_string()))
    }
}

pub struct Profile {
    state: ComponentState,
}

#[async_trait]
impl Component for Profile {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn mount_bindings(&self) -> Vec<MountBinding> {
        vec![MountBinding::entity("user", "User")]
    }
}

/// Any component whose behaviour comes only from decorators and templates.
pub struct Plain {
    pub state: ComponentState,
}

#[async_trait]
impl Component for Plain {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    async fn call(&mut self, method: &str, _params: Vec<Value>) -> Result<Value, EngineError> {
        match method {
            "ping" => Ok(json!("pong")),
            other => Err(EngineError::MethodNotFound {
                component: self.state.name().to_string(),
                method: other.to_string(),
            }),
        }
    }
}

pub struct Chart {
    state: ComponentState,
}

#[async_trait]
impl Component for Chart {
    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    async fn render(&self, view: &View<'_>) -> Result<String, EngineError> {
        self.state.asset("<script src=\"/vendor/chart.js\"></script>")?;
        self.state.script("<script>drawChart()</script>")?;
        view.render_default().await
    }
}

// ── Engine assembly ──────────────────────────────────────────────

pub fn templates() -> TemplateRenderer {
    TemplateRenderer::new()
        .with_template(
            "wirestate/counter",
            "<div>\n  <span>{{ count }}</span> <em>{{ doubled }}</em>\n</div>",
        )
        .with_template("wirestate/inbox", "<div>{{ unread }} unread</div>")
        .with_template("wirestate/report", "<section>{{ rows }} rows</section>")
        .with_template("wirestate/profile", "<div>{{ user.name }}</div>")
        .with_template("wirestate/search", "<form>{{ title }}: {{ q }}</form>")
        .with_template("wirestate/field", "<input type=\"text\">")
        .with_template("wirestate/ping", "<button>ping</button>")
        .with_template("wirestate/admin/user-list", "<ul>{{ flashMessages.status }}</ul>")
        .with_template("wirestate/chart", "<canvas></canvas>")
        .with_template("wirestate/playlist", "<ol>{{ tracks.0 }}</ol>")
        .with_template(
            "components/layouts/main",
            "<html><head><title>{{ title }}</title></head><body>{{{ slot }}}</body></html>",
        )
}

pub fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    registry
        .register("counter", |mut state| {
            state.props = Properties::new().with("count", 0i64).with("owner", "ada");
            Box::new(Counter { state })
        })
        .decorate(Computed::new("doubled", "doubled"))
        .decorate(Locked::new("owner"));

    registry
        .register("inbox", |mut state| {
            state.props.set("unread", 0i64);
            Box::new(Inbox { state })
        })
        .decorate(On::new("cleared", "reset"));

    registry
        .register("report", |mut state| {
            state.props = Properties::new().with("rows", 0i64).with("mounted", false);
            Box::new(Report { state })
        })
        .decorate(Lazy::default());

    registry.register("profile", |mut state| {
        state.props.set("user", Prop::null());
        Box::new(Profile { state })
    });

    registry
        .register("search", |mut state| {
            state.props.set("q", "");
            Box::new(Plain { state })
        })
        .decorate(Url::new("q"))
        .decorate(Title::new("Search"));

    registry
        .register("field", |mut state| {
            state.props.set("text", "");
            Box::new(Plain { state })
        })
        .decorate(Modelable::new("value", "text"));

    registry
        .register("ping", |state| Box::new(Plain { state }))
        .decorate(Renderless);

    registry.register("admin.UserList", |mut state| {
        state.props.set("page", 1i64);
        Box::new(Plain { state })
    });

    registry.register("chart", |state| Box::new(Chart { state }));

    registry.register("playlist", |mut state| {
        state
            .props
            .set("tracks", Prop::List(vec![Prop::from("intro")]));
        Box::new(Plain { state })
    });

    registry
}

pub fn entities() -> Arc<MemoryEntityStore> {
    Arc::new(
        MemoryEntityStore::new()
            .with_record(Record::new("User", 7).with_attribute("name", "Grace"))
            .with_record(Record::new("User", 8).with_attribute("name", "Linus")),
    )
}

pub fn app_with(config: WireConfig) -> App {
    App::new(config.with_app_key(APP_KEY), Arc::new(templates()))
        .expect("app key is set")
        .with_components(registry())
        .with_entities(entities())
}

pub fn engine() -> WireEngine {
    WireEngine::new(app_with(WireConfig::default()))
}

pub fn guarded_engine(guard: Arc<dyn RouteGuard>) -> WireEngine {
    WireEngine::new(app_with(WireConfig::default()).with_guard(guard))
}

pub fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("params must be an object")
}

// ── Reading mounted markup ───────────────────────────────────────

fn unescape(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Unescaped value of the first `name="..."` attribute in `html`.
pub fn attribute(html: &str, name: &str) -> Option<String> {
    let marker = format!("{name}=\"");
    let start = html.find(&marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(unescape(&html[start..end]))
}

pub fn root_snapshot(html: &str) -> Snapshot {
    let raw = attribute(html, "wire:snapshot").expect("wire:snapshot attribute");
    serde_json::from_str(&raw).expect("wire:snapshot is a snapshot")
}

pub fn root_effects(html: &str) -> Value {
    let raw = attribute(html, "wire:effects").expect("wire:effects attribute");
    serde_json::from_str(&raw).expect("wire:effects is JSON")
}
