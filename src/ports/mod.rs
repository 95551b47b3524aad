//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `CaseStore` - Case persistence across the per-form tables
//! - `SessionStore` - Working-copy cache for in-flight sessions
//! - `RemoteValidator` - LLM validation gateway (fail-closed)
//! - `AiProvider` - Chat-completion backend
//! - `CaseReporter` / `Notifier` - Report generation and escalation
//! - `SchemaCompiler` - Registry-to-DDL compilation
//! - `Renderer` - Transport-facing reply presentation

mod ai_provider;
mod case_store;
mod remote_validator;
mod renderer;
mod reporter;
mod schema_compiler;
mod session_store;

pub use ai_provider::{
    AiError, AiProvider, CompletionRequest, CompletionResponse, Message, MessageRole, ProviderInfo,
};
pub use case_store::{CaseSnapshot, CaseStore, CaseStoreError};
pub use remote_validator::{RemoteCheck, RemoteValidator, Verdict};
pub use renderer::{RenderError, Renderer};
pub use reporter::{CaseReport, CaseReporter, Notifier, ReportError};
pub use schema_compiler::{SchemaCompiler, SchemaError};
pub use session_store::SessionStore;
