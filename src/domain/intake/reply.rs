//! Outgoing replies.
//!
//! A reply is the text shown to the user plus the choice options offered
//! at that point. Rendering to a concrete transport (CLI, chat keyboard)
//! is left to the renderer adapter.

use serde::{Deserialize, Serialize};

use crate::domain::registry::FormDefinition;
use crate::domain::validation::AnswerValue;
use std::collections::BTreeMap;

/// A message to present to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Message body.
    pub text: String,

    /// Choice options to offer, in order. Empty when free text is expected.
    pub options: Vec<String>,
}

impl Reply {
    /// Creates a plain text reply with no options.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: Vec::new(),
        }
    }

    /// Creates a reply offering the given options.
    pub fn with_options<I, S>(text: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

/// Renders the per-question checklist for a form.
///
/// Answered questions get a check mark, unanswered ones a cross, in the
/// form's declaration order.
pub fn checklist(form: &FormDefinition, answers: &BTreeMap<String, AnswerValue>) -> String {
    let mut lines = Vec::with_capacity(form.questions().len() + 1);
    lines.push(format!("{}:", form.title()));
    for q in form.questions() {
        let mark = if answers.contains_key(q.key()) {
            "\u{2705}"
        } else {
            "\u{274c}"
        };
        lines.push(format!("{} {}", mark, q.key()));
    }
    lines.join("\n")
}
