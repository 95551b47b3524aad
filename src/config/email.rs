//! Email configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Email configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key
    pub resend_api_key: String,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Address case reports are escalated to
    pub escalation_email: String,
}

impl EmailConfig {
    /// Get formatted "From" header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Validate email configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.resend_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("RESEND_API_KEY"));
        }
        if !self.resend_api_key.starts_with("re_") {
            return Err(ValidationError::InvalidResendKey);
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidFromEmail);
        }
        if !self.escalation_email.contains('@') {
            return Err(ValidationError::InvalidEscalationEmail);
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            escalation_email: String::new(),
        }
    }
}

fn default_from_email() -> String {
    "intake@casework.example".to_string()
}

fn default_from_name() -> String {
    "Case Intake".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_header_combines_name_and_address() {
        let config = EmailConfig {
            from_email: "intake@example.com".to_string(),
            from_name: "Case Intake".to_string(),
            ..Default::default()
        };
        assert_eq!(config.from_header(), "Case Intake <intake@example.com>");
    }

    #[test]
    fn validation_requires_resend_key_prefix() {
        let config = EmailConfig {
            resend_api_key: "sk_wrong".to_string(),
            escalation_email: "vets@example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EmailConfig {
            resend_api_key: "re_test".to_string(),
            escalation_email: "vets@example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_requires_escalation_address() {
        let config = EmailConfig {
            resend_api_key: "re_test".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
