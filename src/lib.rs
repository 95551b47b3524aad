//! Casework - Conversational case intake for poultry-health incidents
//!
//! This crate implements a form-filling conversation engine that collects
//! structured case records one question at a time, persists them per
//! (case, user), and hands completed cases to an LLM-backed reporter.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
