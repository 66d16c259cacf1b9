use async_trait::async_trait;
use serde_json::Value;

use wirestate_kernel::wire::DISPATCH_METHOD;

use crate::error::EngineError;
use crate::hooks::{CallFinisher, ComponentHook, HookCx, ReturnEarly};

/// Routes `__dispatch` calls to listeners and reports listeners and
/// dispatched events to the client.
#[derive(Debug, Default)]
pub struct SupportEvents;

/// Handler methods for `event`: runtime registrations first, then declared.
fn handlers_for(cx: &HookCx<'_>, event: &str) -> Result<Vec<String>, EngineError> {
    let mut methods: Vec<String> = Vec::new();

    let registered = cx.component.state().store().get("listeners")?;
    for listener in registered.as_array().into_iter().flatten() {
        if listener.get("name").and_then(Value::as_str) == Some(event) {
            if let Some(method) = listener.get("method").and_then(Value::as_str) {
                if !methods.iter().any(|m| m == method) {
                    methods.push(method.to_string());
                }
            }
        }
    }
    for (name, method) in cx.component.listeners() {
        if name == event && !methods.contains(&method) {
            methods.push(method);
        }
    }

    Ok(methods)
}

#[async_trait]
impl ComponentHook for SupportEvents {
    async fn call(
        &mut self,
        cx: &mut HookCx<'_>,
        method: &str,
        params: &[Value],
        return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        if method != DISPATCH_METHOD {
            return Ok(None);
        }

        let event = params.first().and_then(Value::as_str).unwrap_or_default();
        let args = params.get(1).cloned().unwrap_or(Value::Null);

        let handlers = handlers_for(cx, event)?;
        if handlers.is_empty() {
            tracing::debug!(event, component = cx.component.state().name(), "no listener for event");
        }
        for handler in handlers {
            cx.component.call(&handler, vec![args.clone()]).await?;
        }

        return_early.resolve(Value::Null);
        Ok(None)
    }

    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        let store = cx.component.state().store();

        if cx.context.mounting() {
            let mut names: Vec<String> = cx
                .component
                .listeners()
                .into_iter()
                .map(|(event, _)| event)
                .collect();
            let registered = store.get("listeners")?;
            for listener in registered.as_array().into_iter().flatten() {
                if let Some(name) = listener.get("name").and_then(Value::as_str) {
                    names.push(name.to_string());
                }
            }

            let mut unique: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                if !unique.contains(&name) {
                    unique.push(name);
                }
            }
            if !unique.is_empty() {
                cx.context.add_effect(
                    "listeners",
                    Value::Array(unique.into_iter().map(Value::String).collect()),
                );
            }
        }

        if store.has("dispatched")? {
            cx.context.add_effect("dispatches", store.get("dispatched")?);
        }
        Ok(())
    }
}
