//! LLM-backed remote validator.
//!
//! Asks a chat model whether a locally-accepted answer is plausible for
//! its question. Fail-closed: timeouts, provider errors, and unparseable
//! replies all become rejections, never acceptances.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::ports::{
    AiProvider, CompletionRequest, MessageRole, RemoteCheck, RemoteValidator, Verdict,
};

const SYSTEM_PROMPT: &str = "You review answers collected during a poultry health \
case intake. Judge whether the answer is a plausible response to the question. \
Reply with JSON only, one of:\n\
{\"verdict\":\"accept\"}\n\
{\"verdict\":\"correct\",\"correction\":\"<normalized answer>\"}\n\
{\"verdict\":\"reject\",\"reason\":\"<short reason for the farmer>\"}";

/// Remote validator that delegates judgment to an LLM.
pub struct LlmValidator {
    provider: Arc<dyn AiProvider>,
    timeout: Duration,
}

impl LlmValidator {
    pub fn new(provider: Arc<dyn AiProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    fn user_prompt(check: &RemoteCheck) -> String {
        format!(
            "Form: {}\nQuestion: {}\nPrompt shown to the farmer: {}\nLocal rule already passed: {}\nAnswer: {}",
            check.form, check.question, check.prompt, check.rule, check.answer
        )
    }

    fn parse_verdict(content: &str) -> Option<Verdict> {
        // Models sometimes wrap JSON in a code fence; strip it.
        let trimmed = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let raw: RawVerdict = serde_json::from_str(trimmed).ok()?;
        match raw.verdict.as_str() {
            "accept" => Some(Verdict::Accepted),
            "correct" => raw.correction.map(Verdict::AcceptedWithCorrection),
            "reject" => Some(Verdict::Rejected(
                raw.reason
                    .unwrap_or_else(|| "answer judged implausible".to_string()),
            )),
            _ => None,
        }
    }
}

#[async_trait]
impl RemoteValidator for LlmValidator {
    async fn check(&self, request: RemoteCheck) -> Verdict {
        let completion = CompletionRequest::new()
            .with_message(MessageRole::System, SYSTEM_PROMPT)
            .with_message(MessageRole::User, Self::user_prompt(&request))
            .with_max_tokens(200)
            .with_temperature(0.0);

        let result = tokio::time::timeout(self.timeout, self.provider.complete(completion)).await;

        let response = match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(question = %request.question, error = %e, "gateway call failed");
                return Verdict::unavailable();
            }
            Err(_) => {
                warn!(question = %request.question, "gateway call timed out");
                return Verdict::unavailable();
            }
        };

        match Self::parse_verdict(&response.content) {
            Some(verdict) => verdict,
            None => {
                warn!(
                    question = %request.question,
                    content = %response.content,
                    "unparseable gateway response"
                );
                Verdict::malformed()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    correction: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AiError, CompletionResponse, ProviderInfo};

    struct CannedProvider {
        reply: Result<String, ()>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl AiProvider for CannedProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, AiError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    model: "canned".to_string(),
                }),
                Err(()) => Err(AiError::unavailable("offline")),
            }
        }

        fn provider_info(&self) -> ProviderInfo {
            ProviderInfo::new("canned", "canned")
        }
    }

    fn validator(reply: Result<String, ()>, delay: Option<Duration>) -> LlmValidator {
        LlmValidator::new(
            Arc::new(CannedProvider { reply, delay }),
            Duration::from_millis(100),
        )
    }

    fn check() -> RemoteCheck {
        RemoteCheck {
            form: "flock_farm_information".to_string(),
            question: "Housing Type".to_string(),
            prompt: "What housing type is used?".to_string(),
            rule: "must be one of: Closed House, Opened-Side".to_string(),
            answer: "Closed House".to_string(),
        }
    }

    #[tokio::test]
    async fn accept_verdict_parses() {
        let v = validator(Ok(r#"{"verdict":"accept"}"#.to_string()), None);
        assert_eq!(v.check(check()).await, Verdict::Accepted);
    }

    #[tokio::test]
    async fn correction_verdict_carries_text() {
        let v = validator(
            Ok(r#"{"verdict":"correct","correction":"Closed House"}"#.to_string()),
            None,
        );
        assert_eq!(
            v.check(check()).await,
            Verdict::AcceptedWithCorrection("Closed House".to_string())
        );
    }

    #[tokio::test]
    async fn reject_verdict_carries_reason() {
        let v = validator(
            Ok(r#"{"verdict":"reject","reason":"not a housing type"}"#.to_string()),
            None,
        );
        assert_eq!(
            v.check(check()).await,
            Verdict::Rejected("not a housing type".to_string())
        );
    }

    #[tokio::test]
    async fn fenced_json_still_parses() {
        let v = validator(
            Ok("```json\n{\"verdict\":\"accept\"}\n```".to_string()),
            None,
        );
        assert_eq!(v.check(check()).await, Verdict::Accepted);
    }

    #[tokio::test]
    async fn garbage_reply_is_rejected_as_malformed() {
        let v = validator(Ok("looks fine to me!".to_string()), None);
        assert_eq!(v.check(check()).await, Verdict::malformed());
    }

    #[tokio::test]
    async fn correction_without_text_is_malformed() {
        let v = validator(Ok(r#"{"verdict":"correct"}"#.to_string()), None);
        assert_eq!(v.check(check()).await, Verdict::malformed());
    }

    #[tokio::test]
    async fn provider_error_is_rejected_as_unavailable() {
        let v = validator(Err(()), None);
        assert_eq!(v.check(check()).await, Verdict::unavailable());
    }

    #[tokio::test]
    async fn slow_provider_is_rejected_as_unavailable() {
        let v = validator(
            Ok(r#"{"verdict":"accept"}"#.to_string()),
            Some(Duration::from_secs(5)),
        );
        assert_eq!(v.check(check()).await, Verdict::unavailable());
    }
}
