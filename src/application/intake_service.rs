//! IntakeService - the command handler driving case intake.
//!
//! One service instance handles every user. Commands from the same user
//! are processed strictly one at a time; a per-user lock is held for the
//! whole command, including validation and persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::application::commands::Command;
use crate::domain::foundation::{CaseId, UserId};
use crate::domain::intake::{checklist, IntakeError, IntakeState, Reply, Session};
use crate::domain::registry::{AnswerRule, FormRegistry, QuestionDefinition};
use crate::domain::validation::{check_answer, LocalOutcome};
use crate::ports::{
    CaseReporter, CaseSnapshot, CaseStore, CaseStoreError, Notifier, RemoteCheck, RemoteValidator,
    SessionStore, Verdict,
};

/// Command handler for case intake conversations.
pub struct IntakeService {
    registry: &'static FormRegistry,
    sessions: Arc<dyn SessionStore>,
    cases: Arc<dyn CaseStore>,
    gateway: Arc<dyn RemoteValidator>,
    reporter: Arc<dyn CaseReporter>,
    notifier: Arc<dyn Notifier>,
    user_locks: StdMutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl IntakeService {
    pub fn new(
        registry: &'static FormRegistry,
        sessions: Arc<dyn SessionStore>,
        cases: Arc<dyn CaseStore>,
        gateway: Arc<dyn RemoteValidator>,
        reporter: Arc<dyn CaseReporter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            sessions,
            cases,
            gateway,
            reporter,
            notifier,
            user_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Handles one command for one user.
    ///
    /// Rejected answers and refused submissions come back as `Ok` replies;
    /// `Err` is reserved for protocol misuse and infrastructure failures.
    #[tracing::instrument(skip(self, command), fields(user = %user))]
    pub async fn handle(&self, user: &UserId, command: Command) -> Result<Reply, IntakeError> {
        let lock = self.lock_for(user);
        let guard = lock.lock().await;

        let result = match command {
            Command::StartOrResume => self.start_or_resume(user).await,
            Command::SelectForm(name) => self.select_form(user, &name).await,
            Command::BackToForms => self.back_to_forms(user).await,
            Command::SelectQuestion(key) => self.select_question(user, &key).await,
            Command::SubmitAnswer(text) => self.submit_answer(user, &text).await,
            Command::CancelEntry => self.cancel_entry(user).await,
            Command::SaveAndQuit => self.save_and_quit(user).await,
            Command::SubmitCase => self.submit_case(user).await,
            Command::DeleteCase => self.delete_case(user).await,
            Command::Confirm => self.confirm(user).await,
            Command::Cancel => self.cancel(user).await,
        };

        drop(guard);
        // A finished conversation has no session; drop its lock entry so
        // the table holds only users mid-conversation.
        if self.sessions.load(user).await.is_none() {
            self.release_lock_if_idle(user);
        }
        result
    }

    /// Conversation state of the user's active session, for transports
    /// that map raw input to commands.
    pub async fn state_of(&self, user: &UserId) -> Option<IntakeState> {
        self.sessions.load(user).await.map(|s| s.state())
    }

    fn lock_for(&self, user: &UserId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(user.clone()).or_default().clone()
    }

    fn release_lock_if_idle(&self, user: &UserId) {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(user) {
            // Exactly two owners when nobody is queued: the map entry
            // and the command that just finished.
            if Arc::strong_count(lock) <= 2 {
                locks.remove(user);
            }
        }
    }

    #[cfg(test)]
    fn lock_table_len(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    async fn start_or_resume(&self, user: &UserId) -> Result<Reply, IntakeError> {
        if let Some(session) = self.sessions.load(user).await {
            if session.state().is_active() {
                return Ok(self.form_menu(&session, "Welcome back."));
            }
        }

        let (session, greeting) = match self
            .cases
            .fetch_latest_open(user)
            .await
            .map_err(|e| IntakeError::infrastructure(e.to_string()))?
        {
            Some(snapshot) => {
                info!(case_id = %snapshot.case_id, "resuming open case");
                let greeting = format!("Resuming case {}.", snapshot.case_id);
                let session = Session::resume(
                    snapshot.case_id,
                    user.clone(),
                    snapshot.answers,
                    snapshot.created_at,
                    snapshot.updated_at,
                );
                (session, greeting)
            }
            None => {
                let case_id = CaseId::new();
                info!(case_id = %case_id, "starting new case");
                let greeting = format!("Starting new case {}.", case_id);
                (Session::new(case_id, user.clone()), greeting)
            }
        };

        let reply = self.form_menu(&session, &greeting);
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn select_form(&self, user: &UserId, name: &str) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.select_form(self.registry, name)?;
        let reply = self.question_menu(&session)?;
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn back_to_forms(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.back_to_forms()?;
        let reply = self.form_menu(&session, "Choose a form.");
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn select_question(&self, user: &UserId, key: &str) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.select_question(self.registry, key)?;
        let question = self.focused_question(&session)?;
        let options = match question.rule() {
            AnswerRule::OneOf { options } => options.clone(),
            _ => Vec::new(),
        };
        let reply = Reply::with_options(question.prompt(), options);
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn submit_answer(&self, user: &UserId, raw: &str) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        if !session.state().accepts_answer_text() {
            return Err(IntakeError::invalid_state("no question is awaiting an answer"));
        }
        let question = self.focused_question(&session)?.clone();
        let form_name = session
            .current_form()
            .ok_or(IntakeError::NoActiveCase)?
            .to_string();

        let value = match check_answer(&question, raw) {
            LocalOutcome::Rejected { explanation } => {
                // Stays in EnteringAnswer; the user just tries again.
                return Ok(Self::rejection_reply(&question, &explanation));
            }
            LocalOutcome::Accepted(value) => value,
        };

        // The gateway sees at most one call per submission, and only for
        // answers that already passed the local rules.
        let value = if question.needs_remote_check() {
            let verdict = self
                .gateway
                .check(RemoteCheck {
                    form: form_name.clone(),
                    question: question.key().to_string(),
                    prompt: question.prompt().to_string(),
                    rule: question.rule().describe(),
                    answer: value.display(),
                })
                .await;
            match verdict {
                Verdict::Accepted => value,
                Verdict::AcceptedWithCorrection(corrected) => {
                    // A correction is only trusted if it passes the same
                    // local rules the original answer did.
                    match check_answer(&question, &corrected) {
                        LocalOutcome::Accepted(v) => v,
                        LocalOutcome::Rejected { .. } => {
                            let reason = Verdict::malformed()
                                .rejection()
                                .unwrap_or_default()
                                .to_string();
                            return Ok(Self::rejection_reply(&question, &reason));
                        }
                    }
                }
                Verdict::Rejected(reason) => {
                    return Ok(Self::rejection_reply(&question, &reason));
                }
            }
        } else {
            value
        };

        session.record_answer(value)?;
        self.sessions.save(session.clone()).await;
        self.persist(&session).await?;
        self.question_menu(&session)
    }

    async fn cancel_entry(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.cancel_entry()?;
        let reply = self.question_menu(&session)?;
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn save_and_quit(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.save_and_quit()?;
        self.persist(&session).await?;
        self.sessions.remove(user).await;
        Ok(Reply::text(format!(
            "Progress saved. Case {} can be resumed later.",
            session.case_id()
        )))
    }

    async fn submit_case(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        match session.request_submit(self.registry) {
            Ok(()) => {}
            Err(IntakeError::Incomplete { missing }) => {
                // Refusal is part of the conversation, not a failure.
                let lines: Vec<String> = missing
                    .iter()
                    .map(|(form, q)| format!("\u{274c} {} / {}", form, q))
                    .collect();
                return Ok(Reply::text(format!(
                    "The case is not complete yet. Still missing:\n{}",
                    lines.join("\n")
                )));
            }
            Err(other) => return Err(other),
        }
        let reply = Reply::with_options(
            format!(
                "Submit case {}? The report will be sent to the veterinary team.",
                session.case_id()
            ),
            ["Yes", "No"],
        );
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn delete_case(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        session.request_delete()?;
        let reply = Reply::with_options(
            format!(
                "Delete case {} and every stored answer? This cannot be undone.",
                session.case_id()
            ),
            ["Yes", "No"],
        );
        self.sessions.save(session).await;
        Ok(reply)
    }

    async fn confirm(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        match session.state() {
            IntakeState::Confirming => {
                session.confirm_submit()?;
                self.persist(&session).await?;
                self.sessions.remove(user).await;
                self.finish_submission(&session).await
            }
            IntakeState::ConfirmingDelete => {
                session.confirm_delete()?;
                match self.cases.delete(user, session.case_id()).await {
                    Ok(()) => {}
                    Err(CaseStoreError::NotFound { .. }) => {
                        // Nothing was ever persisted for this case.
                    }
                    Err(CaseStoreError::PartialDelete { remaining }) => {
                        return Err(IntakeError::PartialDelete { remaining });
                    }
                    Err(e) => return Err(IntakeError::infrastructure(e.to_string())),
                }
                self.sessions.remove(user).await;
                info!(case_id = %session.case_id(), "case deleted");
                Ok(Reply::text(format!("Case {} deleted.", session.case_id())))
            }
            _ => Err(IntakeError::invalid_state("nothing to confirm")),
        }
    }

    async fn cancel(&self, user: &UserId) -> Result<Reply, IntakeError> {
        let mut session = self.require_session(user).await?;
        match session.state() {
            IntakeState::Confirming => {
                session.cancel_submit()?;
                let reply = if session.current_form().is_some() {
                    self.question_menu(&session)?
                } else {
                    self.form_menu(&session, "Submission cancelled.")
                };
                self.sessions.save(session).await;
                Ok(reply)
            }
            IntakeState::ConfirmingDelete => {
                session.cancel_delete()?;
                let reply = self.form_menu(&session, "Deletion cancelled.");
                self.sessions.save(session).await;
                Ok(reply)
            }
            _ => Err(IntakeError::invalid_state("nothing to cancel")),
        }
    }

    /// Generates and escalates the report for a confirmed submission.
    ///
    /// The submission already stands at this point; reporting problems
    /// only degrade the reply.
    async fn finish_submission(&self, session: &Session) -> Result<Reply, IntakeError> {
        let snapshot = Self::snapshot_of(session);
        match self.reporter.generate(&snapshot).await {
            Ok(report) => {
                if let Err(e) = self.notifier.escalate(&report).await {
                    warn!(case_id = %session.case_id(), error = %e, "escalation failed");
                }
                Ok(Reply::text(format!(
                    "Case {} submitted.\n\n{}",
                    session.case_id(),
                    report.summary
                )))
            }
            Err(e) => {
                warn!(case_id = %session.case_id(), error = %e, "report generation failed");
                Ok(Reply::text(format!(
                    "Case {} submitted. The report could not be generated right now; staff will follow up.",
                    session.case_id()
                )))
            }
        }
    }

    async fn require_session(&self, user: &UserId) -> Result<Session, IntakeError> {
        self.sessions
            .load(user)
            .await
            .filter(|s| s.state().is_active())
            .ok_or(IntakeError::NoActiveCase)
    }

    fn focused_question(&self, session: &Session) -> Result<&QuestionDefinition, IntakeError> {
        let form_name = session.current_form().ok_or(IntakeError::NoActiveCase)?;
        let key = session
            .current_question()
            .ok_or_else(|| IntakeError::invalid_state("no question selected"))?;
        let form = self
            .registry
            .form(form_name)
            .ok_or_else(|| IntakeError::form_not_found(form_name))?;
        form.question(key)
            .ok_or_else(|| IntakeError::question_not_found(form_name, key))
    }

    /// Reply for a rejected answer. The original prompt is restated so
    /// the user never loses sight of what is being asked, and choice
    /// options are offered again where the rule declares them.
    fn rejection_reply(question: &QuestionDefinition, explanation: &str) -> Reply {
        let options = match question.rule() {
            AnswerRule::OneOf { options } => options.clone(),
            _ => Vec::new(),
        };
        Reply::with_options(format!("{}\n\n{}", explanation, question.prompt()), options)
    }

    fn form_menu(&self, session: &Session, lead: &str) -> Reply {
        let mut lines = vec![lead.to_string(), "Forms:".to_string()];
        let mut options = Vec::new();
        for form in self.registry.forms() {
            let mark = if session.is_form_complete(self.registry, form.name()) {
                "\u{2705}"
            } else {
                "\u{274c}"
            };
            lines.push(format!("{} {}", mark, form.title()));
            options.push(form.name().to_string());
        }
        Reply::with_options(lines.join("\n"), options)
    }

    fn question_menu(&self, session: &Session) -> Result<Reply, IntakeError> {
        let form_name = session.current_form().ok_or(IntakeError::NoActiveCase)?;
        let form = self
            .registry
            .form(form_name)
            .ok_or_else(|| IntakeError::form_not_found(form_name))?;
        let empty = Default::default();
        let answers = session.answers_for(form_name).unwrap_or(&empty);
        let options: Vec<String> = form
            .questions()
            .iter()
            .map(|q| q.key().to_string())
            .collect();
        Ok(Reply::with_options(checklist(form, answers), options))
    }

    /// Writes the session through to the case store, retrying once on a
    /// transient failure.
    async fn persist(&self, session: &Session) -> Result<(), IntakeError> {
        let snapshot = Self::snapshot_of(session);
        match self.cases.upsert(&snapshot).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => {
                warn!(case_id = %snapshot.case_id, error = %e, "upsert failed, retrying once");
                self.cases
                    .upsert(&snapshot)
                    .await
                    .map_err(|e| IntakeError::infrastructure(e.to_string()))
            }
            Err(e) => Err(IntakeError::infrastructure(e.to_string())),
        }
    }

    fn snapshot_of(session: &Session) -> CaseSnapshot {
        CaseSnapshot {
            case_id: *session.case_id(),
            user_id: session.user_id().clone(),
            answers: session.answers().clone(),
            created_at: *session.created_at(),
            updated_at: *session.updated_at(),
        }
    }
}
