//! In-memory session store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::{
    domain::SessionContext,
    ports::{SessionStore, SessionStoreError, SessionStoreResult},
};
use crate::tenancy::domain::UserId;

/// Thread-safe in-memory session store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    contexts: Arc<RwLock<HashMap<UserId, SessionContext>>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user_id: UserId) -> SessionStoreResult<Option<SessionContext>> {
        let contexts = self.contexts.read().map_err(|err| {
            SessionStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(contexts.get(&user_id).copied())
    }

    async fn save(&self, context: &SessionContext) -> SessionStoreResult<()> {
        let mut contexts = self.contexts.write().map_err(|err| {
            SessionStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        contexts.insert(context.user_id(), *context);
        Ok(())
    }

    async fn clear(&self, user_id: UserId) -> SessionStoreResult<bool> {
        let mut contexts = self.contexts.write().map_err(|err| {
            SessionStoreError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(contexts.remove(&user_id).is_some())
    }
}
