//! Port for per-principal session storage.

use crate::session::domain::SessionContext;
use crate::tenancy::domain::UserId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for session store operations.
pub type SessionStoreResult<T> = Result<T, SessionStoreError>;

/// Ephemeral storage of session contexts, keyed by principal.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the context of `user_id`.
    async fn load(&self, user_id: UserId) -> SessionStoreResult<Option<SessionContext>>;

    /// Stores `context`, replacing any previous one for the same user.
    async fn save(&self, context: &SessionContext) -> SessionStoreResult<()>;

    /// Drops the context of `user_id`. Returns `true` if one existed.
    async fn clear(&self, user_id: UserId) -> SessionStoreResult<bool>;
}

/// Errors returned by session store implementations.
#[derive(Debug, Clone, Error)]
pub enum SessionStoreError {
    /// Storage-layer failure.
    #[error("session storage error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SessionStoreError {
    /// Wraps a storage error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
