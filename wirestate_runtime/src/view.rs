//! Template rendering seam.
//!
//! The engine only needs `render(path, locals)` and
//! `render_raw(markup, locals)` from the host. `TemplateRenderer` is a
//! small built-in implementation: `{{ key }}` escapes, `{{{ key }}}` emits
//! raw, keys may be dotted.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use wirestate_kernel::path::get_in_value;

use crate::error::EngineError;
use crate::html::escape;

pub type ViewData = Map<String, Value>;

#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, path: &str, locals: &ViewData) -> Result<String, EngineError>;

    async fn render_raw(&self, markup: &str, locals: &ViewData) -> Result<String, EngineError>;
}

/// A renderer bound to one component's locals for one render.
pub struct View<'a> {
    renderer: &'a dyn ViewRenderer,
    locals: ViewData,
    default_path: String,
}

impl<'a> View<'a> {
    pub fn new(renderer: &'a dyn ViewRenderer, locals: ViewData, default_path: impl Into<String>) -> Self {
        Self {
            renderer,
            locals,
            default_path: default_path.into(),
        }
    }

    pub fn locals(&self) -> &ViewData {
        &self.locals
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Render the component's own view.
    pub async fn render_default(&self) -> Result<String, EngineError> {
        self.renderer.render(&self.default_path, &self.locals).await
    }

    pub async fn render(&self, path: &str) -> Result<String, EngineError> {
        self.renderer.render(path, &self.locals).await
    }

    pub async fn render_raw(&self, markup: &str) -> Result<String, EngineError> {
        self.renderer.render_raw(markup, &self.locals).await
    }
}

// ── Built-in renderer ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    templates: HashMap<String, String>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, path: &str, markup: &str) -> Self {
        self.register(path, markup);
        self
    }

    pub fn register(&mut self, path: &str, markup: &str) {
        self.templates.insert(path.to_string(), markup.to_string());
    }

    /// Expand `{{ }}` / `{{{ }}}` placeholders against `locals`.
    pub fn expand(markup: &str, locals: &ViewData) -> String {
        let mut out = String::with_capacity(markup.len());
        let mut rest = markup;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start..];

            let (raw, open, close) = if after.starts_with("{{{") {
                (true, 3, "}}}")
            } else {
                (false, 2, "}}")
            };

            match after[open..].find(close) {
                Some(end) => {
                    let key = after[open..open + end].trim();
                    let text = lookup(locals, key).map(display).unwrap_or_default();
                    if raw {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape(&text));
                    }
                    rest = &after[open + end + close.len()..];
                }
                None => {
                    out.push_str(after);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn lookup<'v>(locals: &'v ViewData, key: &str) -> Option<&'v Value> {
    let mut segments = key.split('.');
    let head = segments.next()?;
    let rest: Vec<&str> = segments.collect();
    get_in_value(locals.get(head)?, &rest)
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ViewRenderer for TemplateRenderer {
    async fn render(&self, path: &str, locals: &ViewData) -> Result<String, EngineError> {
        let markup = self.templates.get(path).ok_or_else(|| EngineError::View {
            path: path.to_string(),
            message: "template not found".to_string(),
        })?;
        Ok(Self::expand(markup, locals))
    }

    async fn render_raw(&self, markup: &str, locals: &ViewData) -> Result<String, EngineError> {
        Ok(Self::expand(markup, locals))
    }
}
