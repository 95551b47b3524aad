//! Local answer validation.
//!
//! Pure functions over the registry definitions: no I/O, no clocks. The
//! remote gateway only ever sees answers that already passed this check.

use serde::{Deserialize, Serialize};

use crate::domain::registry::{AnswerRule, QuestionDefinition, ValueKind};

/// A validated, normalized answer value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Integer(i64),
}

impl AnswerValue {
    /// Renders the value as it is shown back to the user.
    pub fn display(&self) -> String {
        match self {
            AnswerValue::Text(s) => s.clone(),
            AnswerValue::Integer(n) => n.to_string(),
        }
    }
}

/// Outcome of local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    /// Answer is acceptable; carries the normalized value to store.
    Accepted(AnswerValue),

    /// Answer is not acceptable; carries the explanation shown to the user.
    Rejected { explanation: String },
}

impl LocalOutcome {
    fn rejected(explanation: impl Into<String>) -> Self {
        LocalOutcome::Rejected {
            explanation: explanation.into(),
        }
    }

    /// Returns true if the answer was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, LocalOutcome::Accepted(_))
    }
}

/// Validates a raw answer against a question definition.
///
/// The raw text is trimmed first; an answer that is empty after trimming
/// is rejected regardless of the question's rule. Integer questions must
/// parse as a whole number before the rule is applied. `OneOf` matching
/// is case-insensitive and normalizes to the declared option's casing.
pub fn check_answer(question: &QuestionDefinition, raw: &str) -> LocalOutcome {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LocalOutcome::rejected(format!(
            "Answer for '{}' cannot be empty",
            question.key()
        ));
    }

    match question.kind() {
        ValueKind::Integer => {
            let value: i64 = match trimmed.parse() {
                Ok(v) => v,
                Err(_) => {
                    return LocalOutcome::rejected(format!(
                        "Answer for '{}' must be a whole number",
                        question.key()
                    ));
                }
            };
            match question.rule() {
                AnswerRule::Range { min, max } => {
                    if value < *min || value > *max {
                        LocalOutcome::rejected(format!(
                            "Answer for '{}' {}",
                            question.key(),
                            question.rule().describe()
                        ))
                    } else {
                        LocalOutcome::Accepted(AnswerValue::Integer(value))
                    }
                }
                _ => LocalOutcome::Accepted(AnswerValue::Integer(value)),
            }
        }
        ValueKind::Text => match question.rule() {
            AnswerRule::Any => LocalOutcome::Accepted(AnswerValue::Text(trimmed.to_string())),
            AnswerRule::OneOf { options } => {
                match options.iter().find(|o| o.eq_ignore_ascii_case(trimmed)) {
                    Some(canonical) => LocalOutcome::Accepted(AnswerValue::Text(canonical.clone())),
                    None => LocalOutcome::rejected(format!(
                        "Answer for '{}' {}",
                        question.key(),
                        question.rule().describe()
                    )),
                }
            }
            AnswerRule::MinLength { n } => {
                if trimmed.chars().count() < *n {
                    LocalOutcome::rejected(format!(
                        "Answer for '{}' {}",
                        question.key(),
                        question.rule().describe()
                    ))
                } else {
                    LocalOutcome::Accepted(AnswerValue::Text(trimmed.to_string()))
                }
            }
            AnswerRule::Range { .. } => {
                // A Range rule on a Text question still requires a number.
                match trimmed.parse::<i64>() {
                    Ok(value) => check_range(question, value),
                    Err(_) => LocalOutcome::rejected(format!(
                        "Answer for '{}' must be a whole number",
                        question.key()
                    )),
                }
            }
        },
    }
}

fn check_range(question: &QuestionDefinition, value: i64) -> LocalOutcome {
    if let AnswerRule::Range { min, max } = question.rule() {
        if value < *min || value > *max {
            return LocalOutcome::rejected(format!(
                "Answer for '{}' {}",
                question.key(),
                question.rule().describe()
            ));
        }
    }
    LocalOutcome::Accepted(AnswerValue::Integer(value))
}
