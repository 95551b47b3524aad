//! In-memory implementation of CaseStore.
//!
//! Backs integration tests and local runs without a database. Implements
//! the same merge and monotonic-clock semantics as the PostgreSQL store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{CaseId, UserId};
use crate::domain::registry::FormRegistry;
use crate::ports::{CaseSnapshot, CaseStore, CaseStoreError};

/// In-memory case store.
pub struct InMemoryCaseStore {
    registry: &'static FormRegistry,
    rows: Mutex<HashMap<(String, CaseId), CaseSnapshot>>,
}

impl InMemoryCaseStore {
    pub fn new(registry: &'static FormRegistry) -> Self {
        Self {
            registry,
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored cases, for test assertions.
    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn upsert(&self, snapshot: &CaseSnapshot) -> Result<(), CaseStoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let key = (snapshot.user_id.to_string(), snapshot.case_id);
        match rows.get_mut(&key) {
            Some(existing) => {
                // Merge: answers absent from the snapshot stay as they were.
                for (form, answers) in &snapshot.answers {
                    let target = existing.answers.entry(form.clone()).or_default();
                    for (question, value) in answers {
                        target.insert(question.clone(), value.clone());
                    }
                }
                existing.updated_at = existing.updated_at.max(snapshot.updated_at);
            }
            None => {
                rows.insert(key, snapshot.clone());
            }
        }
        Ok(())
    }

    async fn fetch(
        &self,
        user: &UserId,
        case_id: &CaseId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rows.get(&(user.to_string(), *case_id)).cloned())
    }

    async fn fetch_latest_open(
        &self,
        user: &UserId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError> {
        Ok(self.fetch_open(user).await?.into_iter().next())
    }

    async fn fetch_open(&self, user: &UserId) -> Result<Vec<CaseSnapshot>, CaseStoreError> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let mut open: Vec<CaseSnapshot> = rows
            .values()
            .filter(|s| s.user_id == *user && !s.is_complete(self.registry))
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(a.case_id.cmp(&b.case_id))
        });
        Ok(open)
    }

    async fn delete(&self, user: &UserId, case_id: &CaseId) -> Result<(), CaseStoreError> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        match rows.remove(&(user.to_string(), *case_id)) {
            Some(_) => Ok(()),
            None => Err(CaseStoreError::not_found(*case_id, user)),
        }
    }
}
