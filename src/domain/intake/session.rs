//! Intake session aggregate.
//!
//! A session is the in-memory working copy of one case: the conversation
//! state, the form and question currently in focus, and every answer
//! recorded so far. Persistence adapters load and store snapshots of it;
//! all state changes go through the methods here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CaseId, StateMachine, Timestamp, UserId};
use crate::domain::intake::{IntakeError, IntakeState};
use crate::domain::registry::FormRegistry;
use crate::domain::validation::AnswerValue;

/// Answers recorded for one form, keyed by question key.
pub type FormAnswers = BTreeMap<String, AnswerValue>;

/// Intake session - the working copy of one case.
///
/// # Invariants
///
/// - `current_question` is only set while `current_form` is set
/// - every form and question key in `answers` exists in the registry
/// - `updated_at` never moves backwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Case this session works on.
    case_id: CaseId,

    /// User who owns the case.
    user_id: UserId,

    /// Current conversation state.
    state: IntakeState,

    /// Form currently in focus, if any.
    current_form: Option<String>,

    /// Question currently awaiting an answer, if any.
    current_question: Option<String>,

    /// All answers recorded so far, keyed by form name.
    answers: BTreeMap<String, FormAnswers>,

    /// When the case was started.
    created_at: Timestamp,

    /// When the case last changed.
    updated_at: Timestamp,
}

impl Session {
    /// Starts a fresh session for a new case.
    pub fn new(case_id: CaseId, user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            case_id,
            user_id,
            state: IntakeState::SelectingForm,
            current_form: None,
            current_question: None,
            answers: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a session from stored answers (resume).
    ///
    /// The session resumes at the form menu regardless of where the user
    /// left off; the checklist shows them what is still missing.
    pub fn resume(
        case_id: CaseId,
        user_id: UserId,
        answers: BTreeMap<String, FormAnswers>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            case_id,
            user_id,
            state: IntakeState::SelectingForm,
            current_form: None,
            current_question: None,
            answers,
            created_at,
            updated_at,
        }
    }

    // Accessors

    pub fn case_id(&self) -> &CaseId {
        &self.case_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self) -> IntakeState {
        self.state
    }

    pub fn current_form(&self) -> Option<&str> {
        self.current_form.as_deref()
    }

    pub fn current_question(&self) -> Option<&str> {
        self.current_question.as_deref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    /// Answers recorded for a form, if any.
    pub fn answers_for(&self, form: &str) -> Option<&FormAnswers> {
        self.answers.get(form)
    }

    /// All answers keyed by form name.
    pub fn answers(&self) -> &BTreeMap<String, FormAnswers> {
        &self.answers
    }

    /// A single recorded answer.
    pub fn answer(&self, form: &str, question: &str) -> Option<&AnswerValue> {
        self.answers.get(form).and_then(|f| f.get(question))
    }

    // Commands

    /// Focuses a form from the form menu.
    pub fn select_form(&mut self, registry: &FormRegistry, name: &str) -> Result<(), IntakeError> {
        if !registry.contains_form(name) {
            return Err(IntakeError::form_not_found(name));
        }
        self.transition(IntakeState::SelectingQuestion)?;
        self.current_form = Some(name.to_string());
        Ok(())
    }

    /// Returns to the form menu from the question checklist.
    pub fn back_to_forms(&mut self) -> Result<(), IntakeError> {
        self.transition(IntakeState::SelectingForm)?;
        self.current_form = None;
        self.current_question = None;
        Ok(())
    }

    /// Focuses a question within the current form.
    pub fn select_question(
        &mut self,
        registry: &FormRegistry,
        key: &str,
    ) -> Result<(), IntakeError> {
        let form_name = self
            .current_form
            .clone()
            .ok_or(IntakeError::NoActiveCase)?;
        let form = registry
            .form(&form_name)
            .ok_or_else(|| IntakeError::form_not_found(&form_name))?;
        if !form.contains(key) {
            return Err(IntakeError::question_not_found(form_name, key));
        }
        self.transition(IntakeState::EnteringAnswer)?;
        self.current_question = Some(key.to_string());
        Ok(())
    }

    /// Records a locally validated answer for the focused question.
    ///
    /// Overwrites any earlier answer to the same question and returns the
    /// session to the question checklist.
    pub fn record_answer(&mut self, value: AnswerValue) -> Result<(), IntakeError> {
        let form = self
            .current_form
            .clone()
            .ok_or(IntakeError::NoActiveCase)?;
        let question = self
            .current_question
            .clone()
            .ok_or_else(|| IntakeError::invalid_state("no question selected"))?;
        self.transition(IntakeState::SelectingQuestion)?;
        self.answers.entry(form).or_default().insert(question, value);
        self.current_question = None;
        Ok(())
    }

    /// Abandons answer entry without recording anything.
    pub fn cancel_entry(&mut self) -> Result<(), IntakeError> {
        self.transition(IntakeState::SelectingQuestion)?;
        self.current_question = None;
        Ok(())
    }

    /// Requests case submission; only a complete case may be confirmed.
    pub fn request_submit(&mut self, registry: &FormRegistry) -> Result<(), IntakeError> {
        let missing = self.missing_questions(registry);
        if !missing.is_empty() {
            return Err(IntakeError::incomplete(missing));
        }
        self.transition(IntakeState::Confirming)
    }

    /// Confirms a pending submission; the session ends.
    pub fn confirm_submit(&mut self) -> Result<(), IntakeError> {
        if self.state != IntakeState::Confirming {
            return Err(IntakeError::invalid_state("no submission pending"));
        }
        self.transition(IntakeState::Ended)
    }

    /// Cancels a pending submission.
    ///
    /// Returns to the checklist when a form is in focus, otherwise to
    /// the form menu.
    pub fn cancel_submit(&mut self) -> Result<(), IntakeError> {
        if self.state != IntakeState::Confirming {
            return Err(IntakeError::invalid_state("no submission pending"));
        }
        if self.current_form.is_some() {
            self.transition(IntakeState::SelectingQuestion)
        } else {
            self.transition(IntakeState::SelectingForm)
        }
    }

    /// Requests deletion of the case.
    pub fn request_delete(&mut self) -> Result<(), IntakeError> {
        self.transition(IntakeState::ConfirmingDelete)
    }

    /// Confirms a pending deletion; the session ends.
    pub fn confirm_delete(&mut self) -> Result<(), IntakeError> {
        if self.state != IntakeState::ConfirmingDelete {
            return Err(IntakeError::invalid_state("no deletion pending"));
        }
        self.transition(IntakeState::Ended)
    }

    /// Cancels a pending deletion and returns to the form menu.
    pub fn cancel_delete(&mut self) -> Result<(), IntakeError> {
        if self.state != IntakeState::ConfirmingDelete {
            return Err(IntakeError::invalid_state("no deletion pending"));
        }
        self.transition(IntakeState::SelectingForm)?;
        self.current_form = None;
        self.current_question = None;
        Ok(())
    }

    /// Ends the session, keeping stored answers for a later resume.
    pub fn save_and_quit(&mut self) -> Result<(), IntakeError> {
        self.transition(IntakeState::Ended)
    }

    // Completeness

    /// Returns true if every question of the named form is answered.
    pub fn is_form_complete(&self, registry: &FormRegistry, form_name: &str) -> bool {
        let Some(form) = registry.form(form_name) else {
            return false;
        };
        let Some(answers) = self.answers.get(form_name) else {
            return form.questions().is_empty();
        };
        form.questions().iter().all(|q| answers.contains_key(q.key()))
    }

    /// Returns true if every question of every form is answered.
    pub fn is_complete(&self, registry: &FormRegistry) -> bool {
        registry
            .forms()
            .iter()
            .all(|f| self.is_form_complete(registry, f.name()))
    }

    /// Unanswered (form, question) pairs in registry order.
    pub fn missing_questions(&self, registry: &FormRegistry) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for form in registry.forms() {
            let answers = self.answers.get(form.name());
            for q in form.questions() {
                let answered = answers.map(|a| a.contains_key(q.key())).unwrap_or(false);
                if !answered {
                    missing.push((form.name().to_string(), q.key().to_string()));
                }
            }
        }
        missing
    }

    fn transition(&mut self, target: IntakeState) -> Result<(), IntakeError> {
        self.state = self
            .state
            .transition_to(target)
            .map_err(|e| IntakeError::invalid_state(e.to_string()))?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        // max() keeps the clock monotonic even if the wall clock steps back.
        self.updated_at = self.updated_at.max(Timestamp::now());
    }
}
