//! Process-wide engine configuration.
//!
//! An `App` is assembled once at startup and is immutable afterwards:
//! registries, collaborators and the checksum secret. Per-request and
//! per-pass state never lives here.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use wirestate_kernel::domain::Prop;
use wirestate_kernel::hashing::Checksum;

use crate::component::{BindingKind, Component, ComponentRegistry, MountArgs};
use crate::config::{ConfigError, WireConfig};
use crate::entities::{EntityStore, MemoryEntityStore};
use crate::error::EngineError;
use crate::guard::{AllowAll, RouteGuard};
use crate::synth::{SynthRegistry, Synthesizer};
use crate::view::ViewRenderer;

pub struct App {
    config: Arc<WireConfig>,
    checksum: Checksum,
    synthesizers: SynthRegistry,
    components: ComponentRegistry,
    views: Arc<dyn ViewRenderer>,
    entities: Arc<dyn EntityStore>,
    guard: Arc<dyn RouteGuard>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("checksum", &self.checksum)
            .field("synthesizers", &self.synthesizers.keys())
            .field("components", &self.components.names())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Fails when the configuration carries no app key.
    pub fn new(config: WireConfig, views: Arc<dyn ViewRenderer>) -> Result<Self, ConfigError> {
        let checksum = Checksum::new(config.app_key()?);
        Ok(Self {
            config: Arc::new(config),
            checksum,
            synthesizers: SynthRegistry::with_defaults(),
            components: ComponentRegistry::new(),
            views,
            entities: Arc::new(MemoryEntityStore::new()),
            guard: Arc::new(AllowAll),
        })
    }

    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn with_entities(mut self, entities: Arc<dyn EntityStore>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_guard(mut self, guard: Arc<dyn RouteGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Appended after the defaults; earlier synthesizers match first.
    pub fn with_synthesizer(mut self, synth: Arc<dyn Synthesizer>) -> Self {
        self.synthesizers.register(synth);
        self
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<WireConfig> {
        Arc::clone(&self.config)
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn synthesizers(&self) -> &SynthRegistry {
        &self.synthesizers
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    pub fn views(&self) -> &dyn ViewRenderer {
        self.views.as_ref()
    }

    pub fn entities(&self) -> &dyn EntityStore {
        self.entities.as_ref()
    }

    pub fn guard(&self) -> &dyn RouteGuard {
        self.guard.as_ref()
    }

    pub fn instantiate(&self, name: &str, id: Option<&str>) -> Result<Box<dyn Component>, EngineError> {
        self.components.instantiate(name, id, &self.config.view_prefix)
    }

    /// Resolve the component's declared mount bindings against `params`.
    ///
    /// Entity bindings must resolve: a missing record is `EntityNotFound`.
    /// A binding whose parameter is absent is skipped.
    pub async fn resolve_mount_args(
        &self,
        component: &dyn Component,
        params: &Map<String, Value>,
    ) -> Result<MountArgs, EngineError> {
        let mut resolved = Vec::new();
        for binding in component.mount_bindings() {
            let Some(raw) = params.get(&binding.name) else {
                continue;
            };
            let prop = match &binding.kind {
                BindingKind::Value => Prop::Value(raw.clone()),
                BindingKind::Entity { model } => {
                    Prop::Record(self.entities.find_or_fail(model, raw).await?)
                }
            };
            resolved.push((binding.name, prop));
        }
        Ok(MountArgs {
            params: params.clone(),
            resolved,
        })
    }
}
