//! Resend implementation of Notifier.
//!
//! Emails case reports to the veterinary escalation address via the
//! Resend HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::ports::{CaseReport, Notifier, ReportError};

const RESEND_URL: &str = "https://api.resend.com/emails";

/// Notifier backed by Resend.
pub struct ResendNotifier {
    config: EmailConfig,
    client: Client,
    endpoint: String,
}

impl ResendNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, ReportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ReportError::delivery(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            endpoint: RESEND_URL.to_string(),
        })
    }

    /// Overrides the API endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, report: &CaseReport) -> EmailPayload {
        EmailPayload {
            from: self.config.from_header(),
            to: vec![self.config.escalation_email.clone()],
            subject: format!("Case {}: {}", report.case_id, report.summary),
            text: report.body.clone(),
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn escalate(&self, report: &CaseReport) -> Result<(), ReportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.resend_api_key),
            )
            .json(&self.payload(report))
            .send()
            .await
            .map_err(|e| ReportError::delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::delivery(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EmailPayload {
    from: String,
    to: Vec<String>,
    subject: String,
    text: String,
}
