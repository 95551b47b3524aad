//! Intake conversation state machine.
//!
//! Defines the lifecycle states of a case intake conversation and the
//! valid transitions between them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// The conversation state of a case intake session.
///
/// Sessions move through these states while a user fills in forms:
/// - `SelectingForm`: Choosing which form to work on
/// - `SelectingQuestion`: Choosing a question within the current form
/// - `EnteringAnswer`: Typing an answer for the selected question
/// - `Confirming`: Awaiting yes/no confirmation of a case submission
/// - `ConfirmingDelete`: Awaiting yes/no confirmation of a case deletion
/// - `Ended`: Conversation over, nothing else accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntakeState {
    /// Form menu shown, waiting for a form choice.
    #[default]
    SelectingForm,

    /// Question checklist shown, waiting for a question choice.
    SelectingQuestion,

    /// Prompt shown, waiting for the answer text.
    EnteringAnswer,

    /// Completeness check passed, waiting for submit confirmation.
    Confirming,

    /// Deletion requested, waiting for delete confirmation.
    ConfirmingDelete,

    /// Session finished (submitted, saved for later, or deleted).
    Ended,
}

impl IntakeState {
    /// Returns true if free-form text from the user is expected.
    pub fn accepts_answer_text(&self) -> bool {
        matches!(self, Self::EnteringAnswer)
    }

    /// Returns true if the session is still in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Ended)
    }

    /// Returns true if the session is waiting on a yes/no.
    pub fn awaits_confirmation(&self) -> bool {
        matches!(self, Self::Confirming | Self::ConfirmingDelete)
    }
}

impl StateMachine for IntakeState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use IntakeState::*;
        matches!(
            (self, target),
            // Form chosen
            (SelectingForm, SelectingQuestion) |
            // Submit requested from the form menu
            (SelectingForm, Confirming) |
            // Delete requested from the form menu
            (SelectingForm, ConfirmingDelete) |
            // Quit without an open form
            (SelectingForm, Ended) |
            // Question chosen
            (SelectingQuestion, EnteringAnswer) |
            // Back to the form menu
            (SelectingQuestion, SelectingForm) |
            // Submit requested on a complete case
            (SelectingQuestion, Confirming) |
            // Delete requested mid-form
            (SelectingQuestion, ConfirmingDelete) |
            // Save-and-quit
            (SelectingQuestion, Ended) |
            // Answer stored or entry cancelled
            (EnteringAnswer, SelectingQuestion) |
            // Submission confirmed
            (Confirming, Ended) |
            // Submission cancelled, back to the checklist
            (Confirming, SelectingQuestion) |
            // Submission cancelled with no form in focus
            (Confirming, SelectingForm) |
            // Deletion confirmed
            (ConfirmingDelete, Ended) |
            // Deletion cancelled
            (ConfirmingDelete, SelectingForm)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use IntakeState::*;
        match self {
            SelectingForm => vec![SelectingQuestion, Confirming, ConfirmingDelete, Ended],
            SelectingQuestion => vec![
                EnteringAnswer,
                SelectingForm,
                Confirming,
                ConfirmingDelete,
                Ended,
            ],
            EnteringAnswer => vec![SelectingQuestion],
            Confirming => vec![Ended, SelectingQuestion, SelectingForm],
            ConfirmingDelete => vec![Ended, SelectingForm],
            Ended => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_selecting_form() {
        assert_eq!(IntakeState::default(), IntakeState::SelectingForm);
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&IntakeState::SelectingQuestion).unwrap();
        assert_eq!(json, "\"selecting_question\"");
    }

    #[test]
    fn only_entering_answer_accepts_answer_text() {
        assert!(IntakeState::EnteringAnswer.accepts_answer_text());
        assert!(!IntakeState::SelectingForm.accepts_answer_text());
        assert!(!IntakeState::Confirming.accepts_answer_text());
    }

    #[test]
    fn ended_is_terminal() {
        assert!(IntakeState::Ended.is_terminal());
        assert!(!IntakeState::Ended.is_active());
        assert!(IntakeState::Ended.valid_transitions().is_empty());
    }

    #[test]
    fn answer_entry_only_returns_to_question_menu() {
        assert_eq!(
            IntakeState::EnteringAnswer.valid_transitions(),
            vec![IntakeState::SelectingQuestion]
        );
    }

    #[test]
    fn confirmation_states_await_yes_no() {
        assert!(IntakeState::Confirming.awaits_confirmation());
        assert!(IntakeState::ConfirmingDelete.awaits_confirmation());
        assert!(!IntakeState::SelectingQuestion.awaits_confirmation());
    }

    #[test]
    fn cannot_jump_from_form_menu_to_answer_entry() {
        assert!(!IntakeState::SelectingForm.can_transition_to(&IntakeState::EnteringAnswer));
    }

    #[test]
    fn cancelled_delete_returns_to_form_menu() {
        assert!(IntakeState::ConfirmingDelete.can_transition_to(&IntakeState::SelectingForm));
        assert!(!IntakeState::ConfirmingDelete.can_transition_to(&IntakeState::SelectingQuestion));
    }

    #[test]
    fn valid_transitions_matches_can_transition_to() {
        for state in [
            IntakeState::SelectingForm,
            IntakeState::SelectingQuestion,
            IntakeState::EnteringAnswer,
            IntakeState::Confirming,
            IntakeState::ConfirmingDelete,
            IntakeState::Ended,
        ] {
            for target in state.valid_transitions() {
                assert!(
                    state.can_transition_to(&target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    state,
                    target
                );
            }
        }
    }
}
