//! Adapters - Implementations of the ports against real infrastructure.

pub mod ai;
pub mod memory;
pub mod postgres;
pub mod renderer;
pub mod report;
