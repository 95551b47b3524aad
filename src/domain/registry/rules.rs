//! Declarative answer rules.
//!
//! Each question carries an explicit rule variant instead of a bare
//! predicate, so rejection messages are derived by matching the variant
//! rather than inspecting code.

use serde::{Deserialize, Serialize};

/// Validation rule attached to a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerRule {
    /// Any non-empty answer is acceptable.
    Any,

    /// Numeric answer within an inclusive range.
    Range { min: i64, max: i64 },

    /// Answer must match one of the listed options (case-insensitive).
    OneOf { options: Vec<String> },

    /// Answer must be at least `n` characters after trimming.
    MinLength { n: usize },
}

impl AnswerRule {
    /// Convenience constructor for an inclusive numeric range.
    pub fn range(min: i64, max: i64) -> Self {
        AnswerRule::Range { min, max }
    }

    /// Convenience constructor for an enumerated choice.
    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnswerRule::OneOf {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Convenience constructor for a minimum length.
    pub fn min_length(n: usize) -> Self {
        AnswerRule::MinLength { n }
    }

    /// Human-readable description of the constraint.
    ///
    /// Used verbatim in rejection messages and in the remote validation
    /// request, so it must fully describe the rule.
    pub fn describe(&self) -> String {
        match self {
            AnswerRule::Any => "any value is accepted".to_string(),
            AnswerRule::Range { min, max } => {
                format!("must be a number between {} and {}", min, max)
            }
            AnswerRule::OneOf { options } => {
                format!("must be one of: {}", options.join(", "))
            }
            AnswerRule::MinLength { n } => format!("must be at least {} characters", n),
        }
    }
}
