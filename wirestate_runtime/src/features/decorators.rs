use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::EngineError;
use crate::hooks::{
    finish_call, finish_render, finish_update, CallFinisher, ComponentHook, HookCx,
    RenderFinisher, ReturnEarly, UpdateFinisher,
};
use crate::view::ViewData;

/// Fans every event out to the component's attached decorators.
#[derive(Debug, Default)]
pub struct SupportDecorators;

#[async_trait]
impl ComponentHook for SupportDecorators {
    async fn boot(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        for decorator in cx.component.state().decorators().to_vec() {
            decorator.boot(cx).await?;
        }
        Ok(())
    }

    async fn mount(
        &mut self,
        cx: &mut HookCx<'_>,
        params: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        for decorator in cx.component.state().decorators().to_vec() {
            decorator.mount(cx, params).await?;
        }
        Ok(())
    }

    async fn hydrate(
        &mut self,
        cx: &mut HookCx<'_>,
        memo: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        for decorator in cx.component.state().decorators().to_vec() {
            decorator.hydrate(cx, memo).await?;
        }
        Ok(())
    }

    async fn update(
        &mut self,
        cx: &mut HookCx<'_>,
        _property: &str,
        full_path: &str,
        value: &Value,
    ) -> Result<Option<UpdateFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for decorator in cx.component.state().decorators().to_vec() {
            if let Some(finish) = decorator.update(cx, full_path, value).await? {
                finishers.push(finish);
            }
        }
        if finishers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(move |value: &Value| finish_update(finishers, value))))
    }

    async fn call(
        &mut self,
        cx: &mut HookCx<'_>,
        method: &str,
        params: &[Value],
        return_early: &mut ReturnEarly,
    ) -> Result<Option<CallFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for decorator in cx.component.state().decorators().to_vec() {
            if let Some(finish) = decorator.call(cx, method, params, return_early).await? {
                finishers.push(finish);
            }
        }
        if finishers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(move |returned: &Value| finish_call(finishers, returned))))
    }

    async fn render(
        &mut self,
        cx: &mut HookCx<'_>,
        view: &mut ViewData,
    ) -> Result<Option<RenderFinisher>, EngineError> {
        let mut finishers = Vec::new();
        for decorator in cx.component.state().decorators().to_vec() {
            if let Some(finish) = decorator.render(cx, view).await? {
                finishers.push(finish);
            }
        }
        if finishers.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(move |html: &mut String| finish_render(finishers, html))))
    }

    async fn dehydrate(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        for decorator in cx.component.state().decorators().to_vec() {
            decorator.dehydrate(cx).await?;
        }
        Ok(())
    }

    async fn destroy(&mut self, cx: &mut HookCx<'_>) -> Result<(), EngineError> {
        for decorator in cx.component.state().decorators().to_vec() {
            decorator.destroy(cx).await?;
        }
        Ok(())
    }
}
