use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::hooks::{ComponentHook, HookCx};

const FORWARD_SCRIPTS: &str = "forwardScriptsToDehydrateMemo";
const FORWARD_ASSETS: &str = "forwardAssetsToDehydrateMemo";

/// Sends each script to the client once per component lifetime and pools
/// page-level assets once per page.
///
/// Keys already sent travel in `memo.scripts` / `memo.assets`.
#[derive(Debug, Default)]
pub struct SupportScriptsAndAssets;

fn key_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(keys) => keys
            .into_iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn entries(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(entries) => entries,
        _ => Map::new(),
    }
}

#[async_trait]
impl ComponentHook for SupportScriptsAndAssets {
    async fn hydrate(
        &mut self,
        cx: &mut HookCx<'_>,
        memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let store = cx.component.state().store();
        if let Some(scripts) = memo.get("scripts") {
            store.set(FORWARD_SCRIPTS, scripts.clone())?;
        }
        if let Some(assets) = memo.get("assets") {
            store.set(FORWARD_ASSETS, assets.clone())?;
        }
        Ok(())
    }

    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        let store = cx.component.state().store();

        let mut sent_scripts = key_list(store.get(FORWARD_SCRIPTS)?);
        for (key, script) in entries(store.get("scripts")?) {
            if !sent_scripts.contains(&key) {
                cx.context.push_effect("scripts", script, Some(&key));
                sent_scripts.push(key);
            }
        }
        cx.context.add_memo(
            "scripts",
            Value::Array(sent_scripts.into_iter().map(Value::String).collect()),
        );

        let mut sent_assets = key_list(store.get(FORWARD_ASSETS)?);
        for (key, asset) in entries(store.get("assets")?) {
            if !sent_assets.contains(&key) {
                let markup = asset.as_str().map(str::to_string).unwrap_or_else(|| asset.to_string());
                cx.request.pool_asset(&key, &markup);
                sent_assets.push(key);
            }
        }
        cx.context.add_memo(
            "assets",
            Value::Array(sent_assets.into_iter().map(Value::String).collect()),
        );
        Ok(())
    }
}
