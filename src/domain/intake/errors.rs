//! Intake-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode};

/// Intake-specific errors.
///
/// Rejected answers and refused submissions are conversation replies,
/// not errors; these variants cover protocol misuse and infrastructure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// The named form is not in the registry.
    FormNotFound(String),
    /// The named question is not in the current form.
    QuestionNotFound { form: String, question: String },
    /// The command is not valid in the current conversation state.
    InvalidState(String),
    /// Submission attempted while required answers are missing.
    Incomplete { missing: Vec<(String, String)> },
    /// No case is currently being worked on.
    NoActiveCase,
    /// Deletion cleared some form tables but not others.
    PartialDelete { remaining: Vec<String> },
    /// Infrastructure error (storage, reporting).
    Infrastructure(String),
}

impl IntakeError {
    pub fn form_not_found(name: impl Into<String>) -> Self {
        IntakeError::FormNotFound(name.into())
    }

    pub fn question_not_found(form: impl Into<String>, question: impl Into<String>) -> Self {
        IntakeError::QuestionNotFound {
            form: form.into(),
            question: question.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        IntakeError::InvalidState(message.into())
    }

    pub fn incomplete(missing: Vec<(String, String)>) -> Self {
        IntakeError::Incomplete { missing }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        IntakeError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            IntakeError::FormNotFound(_) => ErrorCode::FormNotFound,
            IntakeError::QuestionNotFound { .. } => ErrorCode::QuestionNotFound,
            IntakeError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            IntakeError::Incomplete { .. } => ErrorCode::CaseIncomplete,
            IntakeError::NoActiveCase => ErrorCode::NoActiveCase,
            IntakeError::PartialDelete { .. } => ErrorCode::PartialDelete,
            IntakeError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    pub fn message(&self) -> String {
        match self {
            IntakeError::FormNotFound(name) => format!("Unknown form: {}", name),
            IntakeError::QuestionNotFound { form, question } => {
                format!("Form '{}' has no question '{}'", form, question)
            }
            IntakeError::InvalidState(msg) => format!("Invalid state: {}", msg),
            IntakeError::Incomplete { missing } => {
                let fields: Vec<String> = missing
                    .iter()
                    .map(|(form, q)| format!("{}: {}", form, q))
                    .collect();
                format!("Case is incomplete, missing: {}", fields.join("; "))
            }
            IntakeError::NoActiveCase => "No case is currently open".to_string(),
            IntakeError::PartialDelete { remaining } => format!(
                "Deletion incomplete, data remains in: {}",
                remaining.join(", ")
            ),
            IntakeError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for IntakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for IntakeError {}

impl From<IntakeError> for DomainError {
    fn from(err: IntakeError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
