//! Case Store Port - Interface for case persistence.
//!
//! One case spans several per-form tables; the store hides that layout
//! behind snapshot-level operations. A case is "open" while any question
//! is still unanswered, so openness is always recomputable from storage
//! alone.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CaseId, Timestamp, UserId};
use crate::domain::intake::FormAnswers;
use crate::domain::registry::FormRegistry;

/// Persisted view of one case across all forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub case_id: CaseId,
    pub user_id: UserId,
    /// Answers keyed by form name, then question key.
    pub answers: BTreeMap<String, FormAnswers>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CaseSnapshot {
    /// Returns true if every question of every registry form is answered.
    pub fn is_complete(&self, registry: &FormRegistry) -> bool {
        registry.forms().iter().all(|form| {
            let Some(answers) = self.answers.get(form.name()) else {
                return form.questions().is_empty();
            };
            form.questions().iter().all(|q| answers.contains_key(q.key()))
        })
    }
}

/// Port for case persistence.
///
/// Implementations must keep two invariants:
/// - `upsert` never clears a stored answer that is absent from the
///   snapshot; it only adds or overwrites the answers present in it.
/// - the stored `updated_at` never moves backwards.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Inserts or updates the case's answers across all form tables.
    async fn upsert(&self, snapshot: &CaseSnapshot) -> Result<(), CaseStoreError>;

    /// Loads one case for a user.
    async fn fetch(
        &self,
        user: &UserId,
        case_id: &CaseId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError>;

    /// Loads the user's most recently touched open case.
    ///
    /// Ordered by `updated_at` descending, with ties broken by case id
    /// ascending so resume is deterministic.
    async fn fetch_latest_open(
        &self,
        user: &UserId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError>;

    /// Loads all of the user's open cases, most recently touched first.
    async fn fetch_open(&self, user: &UserId) -> Result<Vec<CaseSnapshot>, CaseStoreError>;

    /// Deletes a case from every form table.
    ///
    /// Reports `PartialDelete` if some tables were cleared and others
    /// failed, so the caller can surface which rows survived.
    async fn delete(&self, user: &UserId, case_id: &CaseId) -> Result<(), CaseStoreError>;
}

/// Case store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaseStoreError {
    /// No such case for this user.
    #[error("case {case_id} not found for user {user}")]
    NotFound { case_id: CaseId, user: String },

    /// Deletion removed rows from some tables but not others.
    #[error("delete left rows behind in: {}", remaining.join(", "))]
    PartialDelete { remaining: Vec<String> },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// Stored value could not be decoded.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl CaseStoreError {
    pub fn not_found(case_id: CaseId, user: &UserId) -> Self {
        CaseStoreError::NotFound {
            case_id,
            user: user.to_string(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        CaseStoreError::Database(message.into())
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        CaseStoreError::Corrupt(message.into())
    }

    /// Returns true if a single retry is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaseStoreError::Database(_))
    }
}
