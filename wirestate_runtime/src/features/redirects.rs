use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;
use crate::hooks::{ComponentHook, HookCx};

/// Turns queued redirects into `redirect` / `redirectUsingNavigate` effects.
#[derive(Debug, Default)]
pub struct SupportRedirects;

#[async_trait]
impl ComponentHook for SupportRedirects {
    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        let store = cx.component.state().store();

        if let Some(to) = store.first("redirect")? {
            cx.context.add_effect("redirect", to);
            // The flashes already shown would otherwise replay on the next page.
            cx.request.session().clear_displayed();
        }

        if store.has("redirectUsingNavigate")? {
            cx.context.add_effect("redirectUsingNavigate", Value::Bool(true));
        }
        Ok(())
    }
}
