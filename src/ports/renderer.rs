//! Renderer Port - Transport-facing presentation of replies.
//!
//! The intake service produces `Reply` values; a renderer turns them
//! into whatever the transport needs (terminal output, chat keyboard).

use async_trait::async_trait;

use crate::domain::foundation::UserId;
use crate::domain::intake::Reply;

/// Port for presenting replies to a user.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Shows a reply, including its options if any.
    async fn show(&self, user: &UserId, reply: &Reply) -> Result<(), RenderError>;
}

/// Renderer errors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);
