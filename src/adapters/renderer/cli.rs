//! Terminal renderer.
//!
//! Prints replies to stdout with numbered options; the interactive loop
//! in the binary reads the choice back.

use async_trait::async_trait;
use tokio::io::{stdout, AsyncWriteExt};

use crate::domain::foundation::UserId;
use crate::domain::intake::Reply;
use crate::ports::{RenderError, Renderer};

/// Renderer that writes to the local terminal.
#[derive(Default)]
pub struct CliRenderer;

impl CliRenderer {
    pub fn new() -> Self {
        Self
    }

    fn format(reply: &Reply) -> String {
        let mut out = String::new();
        out.push('\n');
        out.push_str(&reply.text);
        out.push('\n');
        for (i, option) in reply.options.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, option));
        }
        out
    }
}

#[async_trait]
impl Renderer for CliRenderer {
    async fn show(&self, _user: &UserId, reply: &Reply) -> Result<(), RenderError> {
        let mut out = stdout();
        out.write_all(Self::format(reply).as_bytes())
            .await
            .map_err(|e| RenderError(e.to_string()))?;
        out.flush().await.map_err(|e| RenderError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_numbered_from_one() {
        let reply = Reply::with_options("Pick a form", ["a", "b"]);
        let text = CliRenderer::format(&reply);
        assert!(text.contains("  1. a"));
        assert!(text.contains("  2. b"));
    }

    #[test]
    fn plain_replies_have_no_option_lines() {
        let reply = Reply::text("saved");
        let text = CliRenderer::format(&reply);
        assert!(!text.contains("1."));
    }
}
