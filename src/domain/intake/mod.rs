//! Case intake: conversation state, session aggregate, and replies.

mod errors;
mod reply;
mod session;
mod state;

pub use errors::IntakeError;
pub use reply::{checklist, Reply};
pub use session::{FormAnswers, Session};
pub use state::IntakeState;
