//! Remote Validator Port - Interface to the LLM validation gateway.
//!
//! Some answers pass local rules but still need a plausibility check
//! (weather descriptions, symptom lists). The gateway is consulted at
//! most once per submission, only after local validation accepted the
//! answer.
//!
//! The port is infallible by design: adapters map every failure mode
//! (timeout, transport error, malformed response) to a `Rejected`
//! verdict so the caller can never mistake an outage for an acceptance.

use async_trait::async_trait;

/// What the gateway is asked to judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCheck {
    /// Form the question belongs to.
    pub form: String,
    /// Question key.
    pub question: String,
    /// Full prompt shown to the user.
    pub prompt: String,
    /// Description of the local rule the answer already passed.
    pub rule: String,
    /// The locally accepted answer, as the user will see it stored.
    pub answer: String,
}

/// Gateway verdict on an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Answer is plausible as given.
    Accepted,

    /// Answer is plausible after normalization; carries the corrected
    /// text. Callers re-run local validation on the correction before
    /// storing it.
    AcceptedWithCorrection(String),

    /// Answer is rejected; carries the reason shown to the user.
    Rejected(String),
}

impl Verdict {
    /// Rejection used when the gateway cannot be reached in time.
    pub fn unavailable() -> Self {
        Verdict::Rejected("validation service unavailable".to_string())
    }

    /// Rejection used when the gateway answer cannot be parsed.
    pub fn malformed() -> Self {
        Verdict::Rejected("malformed gateway response".to_string())
    }

    /// Returns true for either accepted variant.
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Rejected(_))
    }

    /// The reason carried by a rejection, if any.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            Verdict::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Port for remote answer validation.
#[async_trait]
pub trait RemoteValidator: Send + Sync {
    /// Judges one locally-accepted answer. Never fails; outages become
    /// rejections.
    async fn check(&self, request: RemoteCheck) -> Verdict;
}
