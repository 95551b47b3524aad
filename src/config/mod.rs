//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `CASEWORK` prefix and nested values use `__` as separator.
//!
//! # Example
//!
//! ```no_run
//! use casework::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod database;
mod email;
mod error;

pub use ai::AiConfig;
pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// AI provider configuration (gateway, reporter, schema)
    pub ai: AiConfig,

    /// Email configuration (Resend escalation)
    pub email: EmailConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads variables with the `CASEWORK`
    /// prefix; `__` separates nested values:
    ///
    /// - `CASEWORK__DATABASE__URL=...` -> `database.url`
    /// - `CASEWORK__AI__OPENAI_API_KEY=...` -> `ai.openai_api_key`
    /// - `CASEWORK__EMAIL__ESCALATION_EMAIL=...` -> `email.escalation_email`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CASEWORK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.ai.validate()?;
        self.email.validate()?;
        Ok(())
    }
}
