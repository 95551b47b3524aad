//! LLM-backed case reporter.
//!
//! Turns a submitted case's answers into a structured report for the
//! veterinary team: suspected conditions, severity, and recommended
//! next steps, grounded strictly in what the farmer reported.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{
    AiProvider, CaseReport, CaseReporter, CaseSnapshot, CompletionRequest, MessageRole,
    ReportError,
};

const SYSTEM_PROMPT: &str = "You are a veterinary case-report writer for a poultry \
health service. Given the intake answers for one case, write a concise report: \
1) case overview, 2) notable symptoms and production impact, 3) possible causes \
worth investigating, 4) recommended next steps. Base everything on the provided \
answers; say so when data is missing. Start with a single summary line prefixed \
'SUMMARY: '.";

/// Case reporter that drafts the report with a chat model.
pub struct LlmReporter {
    provider: Arc<dyn AiProvider>,
}

impl LlmReporter {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    fn case_dossier(snapshot: &CaseSnapshot) -> String {
        let mut lines = vec![format!("Case {}", snapshot.case_id)];
        for (form, answers) in &snapshot.answers {
            lines.push(format!("\n[{}]", form));
            for (question, value) in answers {
                lines.push(format!("{}: {}", question, value.display()));
            }
        }
        lines.join("\n")
    }

    /// First line of the report body, without the SUMMARY prefix.
    fn extract_summary(body: &str) -> String {
        body.lines()
            .find_map(|line| line.trim().strip_prefix("SUMMARY:"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| {
                body.lines()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("Case report attached.")
                    .trim()
                    .to_string()
            })
    }
}

#[async_trait]
impl CaseReporter for LlmReporter {
    async fn generate(&self, snapshot: &CaseSnapshot) -> Result<CaseReport, ReportError> {
        let request = CompletionRequest::new()
            .with_message(MessageRole::System, SYSTEM_PROMPT)
            .with_message(MessageRole::User, Self::case_dossier(snapshot))
            .with_max_tokens(1200)
            .with_temperature(0.2);

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| ReportError::generation(e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(ReportError::generation("model returned an empty report"));
        }

        Ok(CaseReport {
            case_id: snapshot.case_id,
            summary: Self::extract_summary(&response.content),
            body: response.content,
        })
    }
}
