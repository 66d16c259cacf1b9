use async_trait::async_trait;

use crate::error::EngineError;
use crate::hooks::{ComponentHook, HookCx};

/// Forwards expressions queued with `ComponentState::js` as `effects.xjs`.
#[derive(Debug, Default)]
pub struct SupportJsEvaluation;

#[async_trait]
impl ComponentHook for SupportJsEvaluation {
    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        let store = cx.component.state().store();
        if store.has("js")? {
            cx.context.add_effect("xjs", store.get("js")?);
        }
        Ok(())
    }
}
