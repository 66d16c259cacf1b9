//! Snapshot assembly.
//!
//! `data` is the dehydrated property bag; `memo` is the default
//! bookkeeping block overlaid with whatever the pass's context collected.
//! Every snapshot leaving this module is stamped.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use wirestate_kernel::domain::Snapshot;

use crate::app::App;
use crate::component::Component;
use crate::decorators::Computed;
use crate::error::EngineError;

/// Memo every snapshot starts from.
pub fn base_memo(component: &dyn Component, locale: &str) -> Map<String, Value> {
    let state = component.state();
    let memo = json!({
        "id": state.id(),
        "name": state.name(),
        "path": state.name().to_lowercase(),
        "method": "GET",
        "children": [],
        "scripts": [],
        "assets": [],
        "errors": [],
        "locale": locale,
    });
    match memo {
        Value::Object(memo) => memo,
        _ => Map::new(),
    }
}

/// True when `name` is served by a `Computed` decorator.
pub fn is_computed(component: &dyn Component, name: &str) -> bool {
    component
        .state()
        .decorators()
        .iter()
        .filter_map(|d| d.as_any().downcast_ref::<Computed>())
        .any(|computed| computed.name == name)
}

/// Dehydrate every property.
///
/// A property no synthesizer supports is logged and sent as its raw JSON
/// rather than failing the response.
pub async fn dehydrate_properties(
    app: &App,
    component: &dyn Component,
) -> Result<Map<String, Value>, EngineError> {
    let mut data = Map::new();
    for (name, prop) in component.state().props.iter() {
        let wire = match app
            .synthesizers()
            .dehydrate(prop, name.to_string(), app.entities())
            .await
        {
            Ok(wire) => wire,
            Err(EngineError::UnsupportedType { path, type_name }) => {
                warn!(
                    component = component.state().name(),
                    property = %path,
                    type_name = %type_name,
                    "unsupported property type, sending raw value"
                );
                prop.to_raw_json()
            }
            Err(other) => return Err(other),
        };
        data.insert(name.to_string(), wire);
    }
    Ok(data)
}

/// Write `data` back into the component.
///
/// Keys that name a computed value or no declared property are ignored.
pub async fn hydrate_properties(
    app: &App,
    component: &mut dyn Component,
    data: Map<String, Value>,
) -> Result<(), EngineError> {
    for (name, wire) in data {
        if is_computed(component, &name) {
            debug!(property = %name, "ignoring client value for computed property");
            continue;
        }
        if !component.state().props.contains(&name) {
            debug!(property = %name, "ignoring undeclared property");
            continue;
        }
        let prop = app
            .synthesizers()
            .hydrate(wire, name.clone(), app.entities())
            .await?;
        component.state_mut().props.set(&name, prop);
    }
    Ok(())
}

/// Dehydrate, merge memo, stamp.
pub async fn build_snapshot(
    app: &App,
    component: &dyn Component,
    context_memo: &Map<String, Value>,
) -> Result<Snapshot, EngineError> {
    let data = dehydrate_properties(app, component).await?;

    let mut memo = base_memo(component, &app.config().locale);
    for (key, value) in context_memo {
        memo.insert(key.clone(), value.clone());
    }

    let mut snapshot = Snapshot::new(data, memo);
    app.checksum().stamp(&mut snapshot)?;
    Ok(snapshot)
}
