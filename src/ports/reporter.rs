//! Reporter Port - Case reporting and escalation.
//!
//! When a case is submitted, a report is generated from its answers and
//! handed to veterinary staff. Report generation failures never undo a
//! successful submission; they are logged and surfaced as a degraded
//! reply instead.

use async_trait::async_trait;

use crate::domain::foundation::CaseId;
use crate::ports::CaseSnapshot;

/// A generated case report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub case_id: CaseId,
    /// Short summary for the notification subject line.
    pub summary: String,
    /// Full report body.
    pub body: String,
}

/// Port for turning a submitted case into a report.
#[async_trait]
pub trait CaseReporter: Send + Sync {
    /// Generates a report from the case's stored answers.
    async fn generate(&self, snapshot: &CaseSnapshot) -> Result<CaseReport, ReportError>;
}

/// Port for delivering reports to staff.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the report to the veterinary escalation channel.
    async fn escalate(&self, report: &CaseReport) -> Result<(), ReportError>;
}

/// Reporting errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReportError {
    /// Report text could not be generated.
    #[error("report generation failed: {0}")]
    Generation(String),

    /// Report could not be delivered.
    #[error("report delivery failed: {0}")]
    Delivery(String),
}

impl ReportError {
    pub fn generation(message: impl Into<String>) -> Self {
        ReportError::Generation(message.into())
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        ReportError::Delivery(message.into())
    }
}
