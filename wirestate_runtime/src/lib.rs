#![forbid(unsafe_code)]

//! Wirestate — Lifecycle Runtime
//!
//! Drives server-side components through mount and update passes on top
//! of the pure `wirestate_kernel` data model: hook pipeline and built-in
//! features, decorators, synthesizers, the pass-scoped store carrier and
//! the host collaborator seams (views, entities, route guard, session).
//!
//! Start with `app::App` (startup configuration) and `engine::WireEngine`.

pub mod app;
pub mod component;
pub mod config;
pub mod decorators;
pub mod engine;
pub mod entities;
pub mod error;
pub mod features;
pub mod guard;
pub mod hooks;
pub mod html;
pub mod request;
pub mod scope;
pub mod snapshot;
pub mod snapshot_codec;
pub mod synth;
pub mod view;

pub use app::App;
pub use component::{Component, ComponentRegistry, ComponentState, Properties};
pub use engine::{MountOptions, WireEngine};
pub use error::{EngineError, ValidationErrors};
pub use request::{RequestScope, Session};
