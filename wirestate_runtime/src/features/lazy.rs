use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::domain::Snapshot;
use wirestate_kernel::hashing::ChecksumError;
use wirestate_kernel::wire::LAZY_LOAD_METHOD;

use crate::decorators::Lazy;
use crate::error::EngineError;
use crate::hooks::{CallFinisher, ComponentHook, HookCx, ReturnEarly};
use crate::html::{escape_js_single_quoted, insert_attributes_into_html_root};
use crate::snapshot::build_snapshot;
use crate::snapshot_codec::CodecError;

/// Memo key holding the mount parameters of a deferred mount.
pub const FOR_MOUNT_MEMO: &str = "__for_mount";

const DEFAULT_PLACEHOLDER: &str = "<div></div>";

/// Defers a component's mount until the client asks for it.
///
/// The mount pass renders a placeholder that carries a signed snapshot of
/// the unmounted component; `__lazyLoad` verifies that snapshot and runs
/// the real mount with the original parameters.
#[derive(Debug, Default)]
pub struct SupportLazyLoading;

impl SupportLazyLoading {
    /// `None` when this mount is not lazy. Otherwise the isolate flag.
    fn lazy_mode(cx: &HookCx<'_>, params: &Map<String, Value>) -> Option<bool> {
        let decorator = cx.component.state().decorator::<Lazy>().copied();
        match params.get("lazy") {
            Some(flag) if !flag.as_bool().unwrap_or(false) => None,
            Some(_) => Some(decorator.map(|d| d.isolate).unwrap_or(false)),
            None => decorator.map(|d| d.isolate),
        }
    }

    async fn placeholder_html(
        cx: &mut HookCx<'_>,
        params: &Map<String, Value>,
    ) -> Result<String, EngineError> {
        let markup = match cx.component.placeholder(params).await? {
            Some(markup) => {
                let locals = cx.component.state().props.to_locals();
                cx.app.views().render_raw(&markup, &locals).await?
            }
            None => DEFAULT_PLACEHOLDER.to_string(),
        };

        cx.context
            .add_memo(FOR_MOUNT_MEMO, Value::Object(params.clone()));
        cx.context.add_memo("lazyLoaded", Value::Bool(false));

        let snapshot = build_snapshot(cx.app, &*cx.component, cx.context.memo()).await?;
        let encoded = serde_json::to_string(&snapshot).map_err(CodecError::Encode)?;

        insert_attributes_into_html_root(
            &markup,
            &[(
                "x-intersect",
                Value::String(format!(
                    "$wire.{}('{}')",
                    LAZY_LOAD_METHOD,
                    escape_js_single_quoted(&encoded)
                )),
            )],
        )
    }
}

/// The client sends the encoded snapshot back verbatim; accept it as a
/// JSON string or as an already-parsed object.
fn pending_snapshot(params: &[Value]) -> Result<Snapshot, EngineError> {
    let raw = params.first().cloned().unwrap_or(Value::Null);
    let snapshot: Snapshot = match raw {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(CodecError::Snapshot)?,
        other => serde_json::from_value(other).map_err(CodecError::Snapshot)?,
    };
    Ok(snapshot)
}

/// A signed payload only mounts the unloaded instance it was issued for.
fn issued_for(pending: &Snapshot, id: &str, name: &str) -> bool {
    pending.id() == Some(id)
        && pending.name() == Some(name)
        && pending.memo.get("lazyLoaded") == Some(&Value::Bool(false))
}

#[async_trait]
impl ComponentHook for SupportLazyLoading {
    async fn mount(
        &mut self,
        cx: &mut HookCx<'_>,
        params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let Some(isolate) = Self::lazy_mode(cx, params) else {
            return Ok(());
        };

        let state = cx.component.state();
        state.skip_mount()?;
        state.store().set("isLazyLoadMounting", Value::Bool(true))?;
        state.store().set("isLazyIsolated", Value::Bool(isolate))?;
        cx.context.add_memo("lazyIsolated", Value::Bool(isolate));

        let html = Self::placeholder_html(cx, params).await?;
        cx.component.state().skip_render(Some(&html))
    }

    async fn hydrate(
        &mut self,
        cx: &mut HookCx<'_>,
        memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        if memo.get("lazyLoaded") == Some(&Value::Bool(false)) {
            cx.component
                .state()
                .store()
                .set("isLazyLoadHydrating", Value::Bool(true))?;
        }
        Ok(())
    }

    async fn call(
        &mut self,
        cx: &mut HookCx<'_>,
        method: &str,
        params: &[Value],
        return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        if method != LAZY_LOAD_METHOD {
            return Ok(None);
        }

        let state = cx.component.state();
        if !state.store().is_set("isLazyLoadHydrating")? || state.store().has("lazyLoadedNow")? {
            tracing::debug!(component = state.name(), "already loaded, ignoring deferred mount");
            return_early.resolve(Value::Null);
            return Ok(None);
        }

        let pending = pending_snapshot(params)?;
        cx.app.checksum().verify(&pending)?;
        if !issued_for(&pending, state.id(), state.name()) {
            tracing::warn!(
                component = state.name(),
                id = state.id(),
                claimed = pending.id().unwrap_or_default(),
                "deferred mount payload issued for another instance"
            );
            return Err(ChecksumError::Corrupt.into());
        }

        if let Some(Value::Object(for_mount)) = pending.memo.get(FOR_MOUNT_MEMO) {
            let args = cx.app.resolve_mount_args(&*cx.component, for_mount).await?;
            cx.component.mount(args).await?;
        }
        cx.component
            .state()
            .store()
            .set("lazyLoadedNow", Value::Bool(true))?;
        tracing::debug!(component = cx.component.state().name(), "deferred mount completed");

        return_early.resolve(Value::Null);
        Ok(None)
    }

    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        let store = cx.component.state().store();
        if store.is_set("isLazyLoadMounting")? {
            cx.context.add_memo("lazyLoaded", Value::Bool(false));
            let isolate = store.first("isLazyIsolated")?.unwrap_or(Value::Bool(false));
            cx.context.add_memo("lazyIsolated", isolate);
        } else if store.is_set("isLazyLoadHydrating")? {
            cx.context
                .add_memo("lazyLoaded", Value::Bool(store.has("lazyLoadedNow")?));
        }
        Ok(())
    }
}
