/// Wirestate — Update Endpoint Wire Types
///
/// Request and response bodies exchanged with the client. Pure data.
/// Snapshots travel as JSON-encoded strings so the client never has to
/// re-serialize them (the checksum is over the server's exact bytes).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::Effects;

/// Reserved method: forward a dispatched event to the component's listener.
pub const DISPATCH_METHOD: &str = "__dispatch";

/// Reserved method: continue a deferred (lazy) mount.
pub const LAZY_LOAD_METHOD: &str = "__lazyLoad";

/// One method invocation requested by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Call {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl Call {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Intercepted by the engine instead of reaching the component.
    pub fn is_reserved(&self) -> bool {
        self.method == DISPATCH_METHOD || self.method == LAZY_LOAD_METHOD
    }
}

/// One component's round trip: prior snapshot, property writes, calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentUpdate {
    pub snapshot: String,
    #[serde(default)]
    pub updates: Map<String, Value>,
    #[serde(default)]
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    pub components: Vec<ComponentUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResponse {
    pub snapshot: String,
    pub effects: Effects,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub components: Vec<ComponentResponse>,
    #[serde(default)]
    pub assets: Vec<String>,
}
