//! Session Store Port - Working-copy cache for in-flight sessions.
//!
//! Holds the live conversation state between user messages. Losing this
//! store is recoverable: the user resumes from the case store, at the
//! cost of re-entering the form menu.

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::domain::intake::Session;

/// Port for the active-session cache. One session per user at most.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the user's active session, if any.
    async fn load(&self, user: &UserId) -> Option<Session>;

    /// Stores (or replaces) the user's active session.
    async fn save(&self, session: Session);

    /// Drops the user's active session.
    async fn remove(&self, user: &UserId);
}
