//! Application layer: command handling and orchestration.

mod commands;
mod intake_service;

pub use commands::Command;
pub use intake_service::IntakeService;
