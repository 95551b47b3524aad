//! Commands accepted by the intake service.

/// One user action against the intake service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Opens a session: resumes the latest open case, or starts a new one.
    StartOrResume,

    /// Chooses a form from the form menu.
    SelectForm(String),

    /// Returns from the question checklist to the form menu.
    BackToForms,

    /// Chooses a question within the current form.
    SelectQuestion(String),

    /// Submits answer text for the selected question.
    SubmitAnswer(String),

    /// Abandons the selected question without answering.
    CancelEntry,

    /// Ends the session, keeping stored answers for later.
    SaveAndQuit,

    /// Asks to submit the whole case; requires completeness.
    SubmitCase,

    /// Asks to delete the case and everything stored for it.
    DeleteCase,

    /// Confirms a pending submission or deletion.
    Confirm,

    /// Cancels a pending submission or deletion.
    Cancel,
}
