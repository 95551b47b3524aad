//! In-memory adapters for tests and database-less runs.

mod case_store;
mod session_store;

pub use case_store::InMemoryCaseStore;
pub use session_store::InMemorySessionStore;
