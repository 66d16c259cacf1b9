//! Lifecycle engine.
//!
//! Two entry points drive a component through one pass each:
//!
//! - `mount`: instantiate, mount hooks, user mount, render, dehydrate,
//!   embed the snapshot into the root element.
//! - `update`: verify, re-guard, hydrate, hydrate hooks, property writes,
//!   method calls, render into `effects.html`, dehydrate.
//!
//! The instance is discarded when its pass ends; `destroy` fires right
//! after `dehydrate`.
//!
//! Each pass runs inside its own `scope::run`, so the ephemeral store a
//! pass writes to is invisible to every other pass.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use wirestate_kernel::context::ComponentContext;
use wirestate_kernel::domain::{Effects, Snapshot};
use wirestate_kernel::invariants::{try_validate_snapshot, InvariantError};
use wirestate_kernel::path::{self, dash_case, set_in_prop, studly};
use wirestate_kernel::wire::{Call, ComponentResponse, UpdateRequest, UpdateResponse};

use crate::app::App;
use crate::component::Component;
use crate::decorators::Layout;
use crate::error::{EngineError, ValidationErrors};
use crate::features::{self, default_features};
use crate::hooks::{finish_call, finish_render, finish_update, FeatureFactory, HookCx, Pipeline, ReturnEarly};
use crate::html::{escape, insert_attributes_into_html_root};
use crate::request::RequestScope;
use crate::scope;
use crate::snapshot::{build_snapshot, hydrate_properties, is_computed};
use crate::snapshot_codec::{decode_snapshot, encode_snapshot};
use crate::view::View;

const EMPTY_ROOT: &str = "<div></div>";

/// Per-mount options supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Wrap the component in this layout unless it declares its own.
    pub layout: Option<Layout>,
    /// Stable key chosen by a parent for this child.
    pub key: Option<String>,
}

impl MountOptions {
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
}

pub struct WireEngine {
    app: Arc<App>,
    features: Vec<FeatureFactory>,
}

impl WireEngine {
    pub fn new(app: App) -> Self {
        Self::with_features(app, default_features())
    }

    pub fn with_features(app: App, features: Vec<FeatureFactory>) -> Self {
        Self {
            app: Arc::new(app),
            features,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    // ── Mount ────────────────────────────────────────────────────

    /// Mount `name` and return its root markup with the snapshot embedded.
    pub async fn mount(
        &self,
        request: &RequestScope,
        name: &str,
        params: Map<String, Value>,
        options: MountOptions,
    ) -> Result<String, EngineError> {
        let mut component = self.app.instantiate(name, None)?;
        if let Some(layout) = options.layout {
            if !component.state().has_decorator::<Layout>() {
                component.state_mut().add_decorator(Arc::new(layout));
            }
        }
        debug!(component = name, id = component.state().id(), key = ?options.key, "mount");

        let result = scope::run(
            self.app.shared_config(),
            self.mount_pass(request, component.as_mut(), &params),
        )
        .await;
        if let Err(err) = &result {
            error!(component = name, error = %err, "mount aborted");
        }
        result
    }

    async fn mount_pass(
        &self,
        request: &RequestScope,
        component: &mut dyn Component,
        params: &Map<String, Value>,
    ) -> Result<String, EngineError> {
        let app = &*self.app;
        debug!(pass = %scope::pass_id()?, component = component.state().name(), "mount pass");
        let mut context = ComponentContext::new(true);
        context.add_memo("path", Value::String(request.path().to_string()));
        let mut pipeline = Pipeline::new(&self.features);

        {
            let mut cx = HookCx {
                component: &mut *component,
                context: &mut context,
                app,
                request,
            };
            pipeline.mount(&mut cx, params).await?;
        }

        let store = component.state().store();
        if store.is_set("skipMount")? {
            debug!(component = component.state().name(), "user mount skipped");
        } else {
            let args = app.resolve_mount_args(&*component, params).await?;
            component.mount(args).await?;
        }

        let html = match self
            .render_component(&mut pipeline, &mut *component, &mut context, request)
            .await?
        {
            Some(html) => html,
            None => with_wire_id(EMPTY_ROOT, component.state().id())?,
        };

        {
            let mut cx = HookCx {
                component: &mut *component,
                context: &mut context,
                app,
                request,
            };
            pipeline.dehydrate(&mut cx).await?;
            pipeline.destroy(&mut cx).await?;
        }

        let snapshot = build_snapshot(app, &*component, context.memo()).await?;

        let mut attributes = forwarded_attributes(params);
        if let Some(binding) = store.first("bindings")? {
            if let Some(inner) = binding.get("inner").and_then(Value::as_str) {
                attributes.push(("x-modelable".to_string(), Value::String(format!("$wire.{inner}"))));
            }
        }
        let (effects, _) = context.into_parts();
        attributes.push(("wire:snapshot".to_string(), Value::String(encode_snapshot(&snapshot)?)));
        attributes.push(("wire:effects".to_string(), Value::String(serde_json::to_string(&effects)?)));

        let attributes: Vec<(&str, Value)> = attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        let html = insert_attributes_into_html_root(&html, &attributes)?;

        match store.first("layout")? {
            Some(layout) => self.wrap_in_layout(&layout, html).await,
            None => Ok(html),
        }
    }

    async fn wrap_in_layout(&self, layout: &Value, html: String) -> Result<String, EngineError> {
        let name = layout
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(self.app.config().layout.as_str());
        let mut locals = match layout.get("props") {
            Some(Value::Object(props)) => props.clone(),
            _ => Map::new(),
        };
        locals.insert("slot".to_string(), Value::String(html));
        self.app
            .views()
            .render(&Layout::view_path(name), &locals)
            .await
    }

    // ── Update ───────────────────────────────────────────────────

    /// Apply `updates` and `calls` to the component a snapshot describes.
    ///
    /// Nothing is hydrated unless the checksum verifies.
    pub async fn update(
        &self,
        request: &RequestScope,
        snapshot: Snapshot,
        updates: Map<String, Value>,
        calls: Vec<Call>,
    ) -> Result<(Snapshot, Effects), EngineError> {
        let app = &*self.app;
        if let Err(err) = app.checksum().verify(&snapshot) {
            warn!(request = %request.id(), "rejected snapshot with bad checksum");
            return Err(err.into());
        }
        try_validate_snapshot(&snapshot)?;

        let path = snapshot.path().unwrap_or_default().to_string();
        app.guard().check(&path, request).await?;

        let name = snapshot
            .name()
            .ok_or_else(|| InvariantError::MissingMemoKey("name".to_string()))?
            .to_string();
        let mut component = app.instantiate(&name, snapshot.id())?;
        hydrate_properties(app, component.as_mut(), snapshot.data.clone()).await?;
        debug!(component = %name, id = component.state().id(), updates = updates.len(), calls = calls.len(), "update");

        let result = scope::run(
            app.shared_config(),
            self.update_pass(request, component.as_mut(), &snapshot.memo, path, updates, calls),
        )
        .await;
        if let Err(err) = &result {
            error!(component = %name, error = %err, "update aborted");
        }
        result
    }

    async fn update_pass(
        &self,
        request: &RequestScope,
        component: &mut dyn Component,
        memo: &Map<String, Value>,
        path: String,
        updates: Map<String, Value>,
        calls: Vec<Call>,
    ) -> Result<(Snapshot, Effects), EngineError> {
        let app = &*self.app;
        debug!(pass = %scope::pass_id()?, component = component.state().name(), "update pass");
        let mut context = ComponentContext::new(false);
        context.add_memo("path", Value::String(path));
        let mut pipeline = Pipeline::new(&self.features);

        {
            let mut cx = HookCx {
                component: &mut *component,
                context: &mut context,
                app,
                request,
            };
            pipeline.hydrate(&mut cx, memo).await?;
        }

        self.apply_updates(&mut pipeline, &mut *component, &mut context, request, updates)
            .await?;
        self.call_methods(&mut pipeline, &mut *component, &mut context, request, calls)
            .await?;

        if let Some(html) = self
            .render_component(&mut pipeline, &mut *component, &mut context, request)
            .await?
        {
            context.add_effect("html", Value::String(html));
        }

        {
            let mut cx = HookCx {
                component: &mut *component,
                context: &mut context,
                app,
                request,
            };
            pipeline.dehydrate(&mut cx).await?;
            pipeline.destroy(&mut cx).await?;
        }

        let snapshot = build_snapshot(app, &*component, context.memo()).await?;
        let (effects, _) = context.into_parts();
        Ok((snapshot, effects))
    }

    /// Writes run strictly in request order. A locked property aborts the
    /// whole batch before it is assigned.
    async fn apply_updates(
        &self,
        pipeline: &mut Pipeline,
        component: &mut dyn Component,
        context: &mut ComponentContext,
        request: &RequestScope,
        updates: Map<String, Value>,
    ) -> Result<(), EngineError> {
        for (full_path, value) in updates {
            let segments = path::split(&full_path)?;
            let property = segments[0].to_string();

            if is_computed(&*component, &property) || !component.state().props.contains(&property) {
                warn!(
                    component = component.state().name(),
                    property = %full_path,
                    "ignoring update to unknown property"
                );
                continue;
            }

            let finishers = {
                let mut cx = HookCx {
                    component: &mut *component,
                    context: &mut *context,
                    app: &self.app,
                    request,
                };
                pipeline.update(&mut cx, &property, &full_path, &value).await?
            };

            let studly_name = studly(&property);
            component.updating(&property, &value).await?;
            component
                .on_hook(&format!("updating{studly_name}"), &value)
                .await?;

            if let Some(prop) = component.state_mut().props.get_mut(&property) {
                set_in_prop(prop, &segments[1..], value.clone())?;
            }

            component.updated(&property, &value).await?;
            component
                .on_hook(&format!("updated{studly_name}"), &value)
                .await?;

            finish_update(finishers, &value)?;
        }
        Ok(())
    }

    /// Calls run in order. Validation and locked-property failures are
    /// flashed and written to `memo.errors`; the remaining calls still run.
    async fn call_methods(
        &self,
        pipeline: &mut Pipeline,
        component: &mut dyn Component,
        context: &mut ComponentContext,
        request: &RequestScope,
        calls: Vec<Call>,
    ) -> Result<(), EngineError> {
        let mut returns = Vec::with_capacity(calls.len());
        let mut failures = ValidationErrors::new();

        for call in calls {
            let outcome = self
                .call_method(pipeline, &mut *component, &mut *context, request, &call)
                .await;
            let err = match outcome {
                Ok(returned) => {
                    returns.push(returned);
                    continue;
                }
                Err(err) => err,
            };

            let handled = {
                let mut cx = HookCx {
                    component: &mut *component,
                    context: &mut *context,
                    app: &self.app,
                    request,
                };
                pipeline.exception(&mut cx, &err).await?
            };

            if err.is_recoverable_in_call() {
                debug!(method = %call.method, error = %err, "call failure flashed");
                failures.merge(flashed_errors(err));
            } else if handled {
                debug!(method = %call.method, error = %err, "call error handled by a feature");
            } else {
                return Err(err);
            }
            returns.push(Value::Null);
        }

        if !failures.is_empty() {
            request.session().flash_validation_errors(&failures);
            context.add_memo("errors", failures.to_json());
        }
        context.add_effect("returns", Value::Array(returns));
        Ok(())
    }

    async fn call_method(
        &self,
        pipeline: &mut Pipeline,
        component: &mut dyn Component,
        context: &mut ComponentContext,
        request: &RequestScope,
        call: &Call,
    ) -> Result<Value, EngineError> {
        let mut early = ReturnEarly::new();
        let finishers = {
            let mut cx = HookCx {
                component: &mut *component,
                context,
                app: &self.app,
                request,
            };
            pipeline
                .call(&mut cx, &call.method, &call.params, &mut early)
                .await?
        };

        let returned = match early.take() {
            Some(value) => value,
            None if call.is_reserved() => Value::Null,
            None => component.call(&call.method, call.params.clone()).await?,
        };
        finish_call(finishers, &returned)?;
        Ok(returned)
    }

    // ── Render ───────────────────────────────────────────────────

    /// `None` when the pass asked to skip rendering outright.
    async fn render_component(
        &self,
        pipeline: &mut Pipeline,
        component: &mut dyn Component,
        context: &mut ComponentContext,
        request: &RequestScope,
    ) -> Result<Option<String>, EngineError> {
        match component.state().store().first("skipRender")? {
            Some(Value::String(html)) => {
                return with_wire_id(&html, component.state().id()).map(Some);
            }
            Some(Value::Bool(true)) => return Ok(None),
            _ => {}
        }

        let mut view_data = component.state().props.to_locals();
        {
            let mut session = request.session();
            session.commit();
            view_data.insert(
                "flashMessages".to_string(),
                Value::Object(session.flash_messages().clone()),
            );
            view_data.insert("errors".to_string(), session.errors());
        }

        let finishers = {
            let mut cx = HookCx {
                component: &mut *component,
                context,
                app: &self.app,
                request,
            };
            pipeline.render(&mut cx, &mut view_data).await?
        };

        let rendered = {
            let view = View::new(self.app.views(), view_data, component.state().view_path());
            component.render(&view).await?
        };
        let mut html = with_wire_id(&rendered, component.state().id())?;
        finish_render(finishers, &mut html)?;

        request.session().clear_displayed();
        Ok(Some(html))
    }

    // ── Endpoint ─────────────────────────────────────────────────

    /// Serve one update-endpoint request.
    pub async fn handle(
        &self,
        request: &RequestScope,
        body: UpdateRequest,
    ) -> Result<UpdateResponse, EngineError> {
        let mut components = Vec::with_capacity(body.components.len());
        for entry in body.components {
            let snapshot = decode_snapshot(&entry.snapshot)?;
            let (snapshot, effects) = self
                .update(request, snapshot, entry.updates, entry.calls)
                .await?;
            components.push(ComponentResponse {
                snapshot: encode_snapshot(&snapshot)?,
                effects,
            });
        }
        Ok(UpdateResponse {
            components,
            assets: request.drain_assets(),
        })
    }

    /// Inject pooled page assets into a full-page response.
    pub fn finish_response(&self, request: &RequestScope, html: String) -> String {
        features::finish_response(self.app.config(), request, html)
    }

    /// Client bootstrap `<script>` tag.
    pub fn scripts_tag(&self, request: &RequestScope) -> String {
        let config = self.app.config();
        format!(
            "<script src=\"/wirestate/wirestate.js?v={}\" data-csrf=\"{}\" data-update-uri=\"{}\" data-navigate-once=\"true\"></script>",
            escape(&config.asset_version),
            escape(request.csrf_token()),
            escape(&config.update_uri),
        )
    }

    pub fn styles_tag(&self) -> String {
        let config = self.app.config();
        let mut tag = format!(
            "<link rel=\"stylesheet\" href=\"/wirestate/wirestate.css?v={}\">",
            escape(&config.asset_version)
        );
        if config.navigate.show_progress_bar {
            tag.push_str(&format!(
                "<style>[data-wirestate-progress] {{ background: {}; }}</style>",
                escape(&config.navigate.progress_bar_color)
            ));
        }
        tag
    }
}

fn with_wire_id(html: &str, id: &str) -> Result<String, EngineError> {
    insert_attributes_into_html_root(html, &[("wire:id", Value::String(id.to_string()))])
}

/// `@event` params become parent listeners; `wire:*` params pass through.
fn forwarded_attributes(params: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut attributes = Vec::new();
    for (key, value) in params {
        if let Some(event) = key.strip_prefix('@') {
            let handler = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            attributes.push((
                format!("x-on:{}", dash_case(event)),
                Value::String(format!("$wire.$parent.{handler}")),
            ));
        } else if key.starts_with("wire:") {
            attributes.push((key.clone(), value.clone()));
        }
    }
    attributes
}

/// Field messages for a call failure the loop recovers from.
fn flashed_errors(err: EngineError) -> ValidationErrors {
    match err {
        EngineError::Validation(errors) => errors,
        EngineError::LockedProperty(name) => {
            let message = EngineError::LockedProperty(name.clone()).to_string();
            ValidationErrors::new().with(&name, &message)
        }
        other => ValidationErrors::new().with("call", &other.to_string()),
    }
}
