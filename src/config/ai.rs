//! AI provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// OpenAI API key
    pub openai_api_key: String,

    /// Model for the validation gateway and reporter
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Gateway timeout in seconds; past this the answer is rejected
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Use the model to draft the database schema instead of deriving it
    #[serde(default)]
    pub llm_schema: bool,
}

impl AiConfig {
    /// Get gateway timeout as Duration
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.openai_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("OPENAI_API_KEY"));
        }
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 120 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            gateway_timeout_secs: default_gateway_timeout(),
            llm_schema: false,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}
