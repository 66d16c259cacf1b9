//! Request scope and flash session.
//!
//! One `RequestScope` per HTTP request, shared by every component pass the
//! request drives. Request-level mutable state (session flashes, pooled
//! page assets) sits behind `parking_lot::Mutex` guards that are never
//! held across an await.

use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ValidationErrors;

const ERRORS_KEY: &str = "errors";

// ── Session flashes ──────────────────────────────────────────────

/// Flash storage with two generations.
///
/// `displayed` holds messages visible to the current request; `pending`
/// holds messages flashed during it, which become visible to the next
/// request (or to this one once committed by a render).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    displayed: Map<String, Value>,
    pending: Map<String, Value>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flash(&mut self, key: &str, value: Value) {
        self.pending.insert(key.to_string(), value);
    }

    /// Merge field errors into the pending `errors` flash.
    pub fn flash_validation_errors(&mut self, errors: &ValidationErrors) {
        let slot = self
            .pending
            .entry(ERRORS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let (Value::Object(existing), Value::Object(incoming)) = (slot, errors.to_json()) {
            existing.extend(incoming);
        }
    }

    /// Make pending flashes visible to the render about to happen.
    pub fn commit(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.displayed.extend(pending);
    }

    pub fn flash_messages(&self) -> &Map<String, Value> {
        &self.displayed
    }

    pub fn pending(&self) -> &Map<String, Value> {
        &self.pending
    }

    pub fn errors(&self) -> Value {
        self.displayed
            .get(ERRORS_KEY)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Forget messages already shown (or skipped by a redirect).
    /// Pending flashes survive to the next request.
    pub fn clear_displayed(&mut self) {
        self.displayed.clear();
    }

    /// The session as the next request sees it.
    pub fn age(mut self) -> Self {
        self.displayed = std::mem::take(&mut self.pending);
        self
    }
}

// ── Request scope ────────────────────────────────────────────────

#[derive(Debug)]
pub struct RequestScope {
    id: Uuid,
    path: String,
    input: Map<String, Value>,
    csrf_token: String,
    session: Mutex<Session>,
    assets: Mutex<Vec<(String, String)>>,
}

impl RequestScope {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            input: Map::new(),
            csrf_token: Uuid::new_v4().simple().to_string(),
            session: Mutex::new(Session::new()),
            assets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_input(mut self, input: Map<String, Value>) -> Self {
        self.input = input;
        self
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = token.into();
        self
    }

    pub fn with_session(self, session: Session) -> Self {
        *self.session.lock() = session;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query/body input by name.
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.input.get(name)
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock()
    }

    pub fn into_session(self) -> Session {
        self.session.into_inner()
    }

    /// Pool a page-level asset once per request.
    pub fn pool_asset(&self, key: &str, markup: &str) {
        let mut assets = self.assets.lock();
        if !assets.iter().any(|(k, _)| k == key) {
            assets.push((key.to_string(), markup.to_string()));
        }
    }

    pub fn has_pooled_assets(&self) -> bool {
        !self.assets.lock().is_empty()
    }

    pub fn drain_assets(&self) -> Vec<String> {
        self.assets
            .lock()
            .drain(..)
            .map(|(_, markup)| markup)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn committed_flashes_display_then_clear() {
        let mut session = Session::new();
        session.flash("status", json!("saved"));
        assert!(session.flash_messages().is_empty());

        session.commit();
        assert_eq!(session.flash_messages().get("status"), Some(&json!("saved")));

        session.clear_displayed();
        assert!(session.flash_messages().is_empty());
        assert!(session.pending().is_empty());
    }

    #[test]
    fn cleared_displays_keep_new_flashes_for_next_request() {
        let mut session = Session::new();
        session.flash("old", json!(1));
        let mut session = session.age();
        session.flash("status", json!("moved"));

        session.clear_displayed();
        let next = session.age();
        assert_eq!(next.flash_messages().get("status"), Some(&json!("moved")));
        assert!(next.flash_messages().get("old").is_none());
    }

    #[test]
    fn validation_errors_merge() {
        let mut session = Session::new();
        session.flash_validation_errors(&ValidationErrors::new().with("email", "required"));
        session.flash_validation_errors(&ValidationErrors::new().with("name", "too short"));
        session.commit();
        assert_eq!(
            session.errors(),
            json!({"email": ["required"], "name": ["too short"]})
        );
    }

    #[test]
    fn assets_pool_once_per_key() {
        let request = RequestScope::new("/");
        request.pool_asset("k", "<link a>");
        request.pool_asset("k", "<link a>");
        request.pool_asset("j", "<link b>");
        assert!(request.has_pooled_assets());
        assert_eq!(request.drain_assets(), vec!["<link a>", "<link b>"]);
        assert!(!request.has_pooled_assets());
    }
}
