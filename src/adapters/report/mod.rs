//! Reporting adapters.

mod llm_reporter;
mod resend_notifier;

pub use llm_reporter::LlmReporter;
pub use resend_notifier::ResendNotifier;
