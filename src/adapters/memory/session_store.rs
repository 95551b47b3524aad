//! In-memory implementation of SessionStore.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::UserId;
use crate::domain::intake::Session;
use crate::ports::SessionStore;

/// In-memory session store. One process, one session per user.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user: &UserId) -> Option<Session> {
        self.sessions.read().await.get(user).cloned()
    }

    async fn save(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.user_id().clone(), session);
    }

    async fn remove(&self, user: &UserId) {
        self.sessions.write().await.remove(user);
    }
}
