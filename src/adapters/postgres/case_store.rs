//! PostgreSQL implementation of CaseStore.
//!
//! One table per form, one row per (case_id, farmer), one column per
//! question. Tables and columns come from the registry at runtime, so
//! every statement is built dynamically; values are always bound, never
//! spliced.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::warn;

use crate::domain::foundation::{CaseId, Timestamp, UserId};
use crate::domain::intake::FormAnswers;
use crate::domain::registry::{FormDefinition, FormRegistry, ValueKind};
use crate::domain::validation::AnswerValue;
use crate::ports::{CaseSnapshot, CaseStore, CaseStoreError};

/// PostgreSQL implementation of CaseStore.
#[derive(Clone)]
pub struct PostgresCaseStore {
    pool: PgPool,
    registry: &'static FormRegistry,
}

impl PostgresCaseStore {
    /// Creates a new PostgresCaseStore.
    pub fn new(pool: PgPool, registry: &'static FormRegistry) -> Self {
        Self { pool, registry }
    }

    /// Builds the per-form upsert statement over the answered columns.
    ///
    /// `updated_at` takes the newer of the stored and incoming values so
    /// the case clock never moves backwards.
    fn upsert_sql(table: &str, columns: &[String]) -> String {
        let placeholders: Vec<String> = (0..columns.len())
            .map(|i| format!("${}", i + 5))
            .collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}"))
            .collect();
        format!(
            "INSERT INTO {table} (case_id, farmer, created_at, updated_at, {cols})\n\
             VALUES ($1, $2, $3, $4, {vals})\n\
             ON CONFLICT (case_id, farmer) DO UPDATE SET\n\
             {updates},\n\
             updated_at = GREATEST({table}.updated_at, EXCLUDED.updated_at)",
            cols = columns.join(", "),
            vals = placeholders.join(", "),
            updates = updates.join(",\n"),
        )
    }

    fn bind_value<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: &AnswerValue,
    ) -> Query<'q, Postgres, PgArguments> {
        match value {
            AnswerValue::Text(s) => query.bind(s.clone()),
            AnswerValue::Integer(n) => query.bind(*n),
        }
    }

    /// Upserts one form's answers. Only the answered columns appear in
    /// the statement, so answers absent from the snapshot are never
    /// cleared.
    async fn upsert_form(
        &self,
        form: &FormDefinition,
        snapshot: &CaseSnapshot,
        answers: &FormAnswers,
    ) -> Result<(), CaseStoreError> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for q in form.questions() {
            if let Some(value) = answers.get(q.key()) {
                columns.push(q.column_name());
                values.push(value.clone());
            }
        }
        if columns.is_empty() {
            return Ok(());
        }

        let sql = Self::upsert_sql(form.table_name(), &columns);
        let mut query = sqlx::query(&sql)
            .bind(snapshot.case_id.as_uuid())
            .bind(snapshot.user_id.as_str().to_string())
            .bind(*snapshot.created_at.as_datetime())
            .bind(*snapshot.updated_at.as_datetime());
        for value in &values {
            query = Self::bind_value(query, value);
        }

        query.execute(&self.pool).await.map_err(|e| {
            CaseStoreError::database(format!(
                "Failed to upsert {}: {}",
                form.table_name(),
                e
            ))
        })?;
        Ok(())
    }

    /// Reads one form's row for a case, decoding answered columns.
    async fn fetch_form(
        &self,
        form: &FormDefinition,
        user: &UserId,
        case_id: &CaseId,
    ) -> Result<Option<(FormAnswers, Timestamp, Timestamp)>, CaseStoreError> {
        let columns: Vec<String> = form.questions().iter().map(|q| q.column_name()).collect();
        let sql = format!(
            "SELECT created_at, updated_at, {} FROM {} WHERE case_id = $1 AND farmer = $2",
            columns.join(", "),
            form.table_name()
        );

        let row = sqlx::query(&sql)
            .bind(case_id.as_uuid())
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                CaseStoreError::database(format!(
                    "Failed to fetch {}: {}",
                    form.table_name(),
                    e
                ))
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| CaseStoreError::corrupt(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| CaseStoreError::corrupt(e.to_string()))?;

        let mut answers = FormAnswers::new();
        for q in form.questions() {
            let col = q.column_name();
            match q.kind() {
                ValueKind::Text => {
                    let value: Option<String> = row
                        .try_get(col.as_str())
                        .map_err(|e| CaseStoreError::corrupt(e.to_string()))?;
                    if let Some(v) = value {
                        answers.insert(q.key().to_string(), AnswerValue::Text(v));
                    }
                }
                ValueKind::Integer => {
                    let value: Option<i64> = row
                        .try_get(col.as_str())
                        .map_err(|e| CaseStoreError::corrupt(e.to_string()))?;
                    if let Some(v) = value {
                        answers.insert(q.key().to_string(), AnswerValue::Integer(v));
                    }
                }
            }
        }

        Ok(Some((
            answers,
            Timestamp::from_datetime(created_at),
            Timestamp::from_datetime(updated_at),
        )))
    }

    /// Lists a user's case ids across every form table, newest first.
    ///
    /// A case touched in several tables appears once, under its newest
    /// `updated_at`; ties fall back to case id order so resume is
    /// deterministic.
    async fn list_case_ids(&self, user: &UserId) -> Result<Vec<CaseId>, CaseStoreError> {
        let union: Vec<String> = self
            .registry
            .forms()
            .iter()
            .map(|f| {
                format!(
                    "SELECT case_id, updated_at FROM {} WHERE farmer = $1",
                    f.table_name()
                )
            })
            .collect();
        let sql = format!(
            "SELECT case_id, MAX(updated_at) AS last_touch FROM ({}) AS all_rows \
             GROUP BY case_id ORDER BY last_touch DESC, case_id ASC",
            union.join(" UNION ALL ")
        );

        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CaseStoreError::database(format!("Failed to list cases: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let id: uuid::Uuid = row
                    .try_get("case_id")
                    .map_err(|e| CaseStoreError::corrupt(e.to_string()))?;
                Ok(CaseId::from_uuid(id))
            })
            .collect()
    }
}

#[async_trait]
impl CaseStore for PostgresCaseStore {
    async fn upsert(&self, snapshot: &CaseSnapshot) -> Result<(), CaseStoreError> {
        for form in self.registry.forms() {
            if let Some(answers) = snapshot.answers.get(form.name()) {
                self.upsert_form(form, snapshot, answers).await?;
            }
        }
        Ok(())
    }

    async fn fetch(
        &self,
        user: &UserId,
        case_id: &CaseId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError> {
        let mut answers: BTreeMap<String, FormAnswers> = BTreeMap::new();
        let mut created_at: Option<Timestamp> = None;
        let mut updated_at: Option<Timestamp> = None;

        for form in self.registry.forms() {
            if let Some((form_answers, created, updated)) =
                self.fetch_form(form, user, case_id).await?
            {
                if !form_answers.is_empty() {
                    answers.insert(form.name().to_string(), form_answers);
                }
                created_at = Some(match created_at {
                    Some(t) if t.is_before(&created) => t,
                    Some(_) | None => created,
                });
                updated_at = Some(updated_at.map_or(updated, |t| t.max(updated)));
            }
        }

        let (Some(created_at), Some(updated_at)) = (created_at, updated_at) else {
            return Ok(None);
        };

        Ok(Some(CaseSnapshot {
            case_id: *case_id,
            user_id: user.clone(),
            answers,
            created_at,
            updated_at,
        }))
    }

    async fn fetch_latest_open(
        &self,
        user: &UserId,
    ) -> Result<Option<CaseSnapshot>, CaseStoreError> {
        // Openness is recomputed from the stored answers, so a case that
        // became complete without being cleaned up never resumes.
        for case_id in self.list_case_ids(user).await? {
            if let Some(snapshot) = self.fetch(user, &case_id).await? {
                if !snapshot.is_complete(self.registry) {
                    return Ok(Some(snapshot));
                }
            }
        }
        Ok(None)
    }

    async fn fetch_open(&self, user: &UserId) -> Result<Vec<CaseSnapshot>, CaseStoreError> {
        let mut open = Vec::new();
        for case_id in self.list_case_ids(user).await? {
            if let Some(snapshot) = self.fetch(user, &case_id).await? {
                if !snapshot.is_complete(self.registry) {
                    open.push(snapshot);
                }
            }
        }
        Ok(open)
    }

    async fn delete(&self, user: &UserId, case_id: &CaseId) -> Result<(), CaseStoreError> {
        // Deliberately not transactional: each table is cleared on its
        // own so a mid-way failure can be reported precisely.
        let mut removed_any = false;
        let mut remaining = Vec::new();

        for form in self.registry.forms() {
            let sql = format!(
                "DELETE FROM {} WHERE case_id = $1 AND farmer = $2",
                form.table_name()
            );
            match sqlx::query(&sql)
                .bind(case_id.as_uuid())
                .bind(user.as_str())
                .execute(&self.pool)
                .await
            {
                Ok(result) => {
                    if result.rows_affected() > 0 {
                        removed_any = true;
                    }
                }
                Err(e) => {
                    warn!(table = form.table_name(), error = %e, "delete failed");
                    remaining.push(form.table_name().to_string());
                }
            }
        }

        if !remaining.is_empty() {
            if removed_any {
                return Err(CaseStoreError::PartialDelete { remaining });
            }
            return Err(CaseStoreError::database(format!(
                "delete failed for all tables of case {}",
                case_id
            )));
        }
        if !removed_any {
            return Err(CaseStoreError::not_found(*case_id, user));
        }
        Ok(())
    }
}
