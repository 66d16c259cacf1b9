//! Route re-guarding.
//!
//! An update re-runs the guard of the route its component was mounted on
//! (`memo.path`), so authorization is checked on every interaction.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::request::RequestScope;

#[async_trait]
pub trait RouteGuard: Send + Sync {
    /// `Err(EngineError::RequestAborted { .. })` rejects the update.
    async fn check(&self, path: &str, request: &RequestScope) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl RouteGuard for AllowAll {
    async fn check(&self, _path: &str, _request: &RequestScope) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Rejects every path starting with one of the given prefixes.
#[derive(Debug, Clone, Default)]
pub struct DenyPrefixes {
    prefixes: Vec<String>,
    status: u16,
}

impl DenyPrefixes {
    pub fn new(prefixes: &[&str], status: u16) -> Self {
        Self {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            status,
        }
    }
}

#[async_trait]
impl RouteGuard for DenyPrefixes {
    async fn check(&self, path: &str, _request: &RequestScope) -> Result<(), EngineError> {
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Err(EngineError::RequestAborted {
                status: self.status,
                body: format!("access to {} denied", path),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deny_prefixes_aborts_with_status() {
        let guard = DenyPrefixes::new(&["/admin"], 403);
        let request = RequestScope::new("/wirestate/update");
        assert!(guard.check("/posts", &request).await.is_ok());
        assert!(matches!(
            guard.check("/admin/users", &request).await,
            Err(EngineError::RequestAborted { status: 403, .. })
        ));
        assert!(AllowAll.check("/admin", &request).await.is_ok());
    }
}
