//! Renderer adapters.

mod cli;

pub use cli::CliRenderer;
