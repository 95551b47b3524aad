//! PostgreSQL adapters.

mod case_store;

pub use case_store::PostgresCaseStore;

use sqlx::PgPool;

use crate::ports::CaseStoreError;

/// Applies compiled schema statements at startup.
pub async fn apply_schema(pool: &PgPool, statements: &[String]) -> Result<(), CaseStoreError> {
    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| CaseStoreError::database(format!("Failed to apply schema: {}", e)))?;
    }
    Ok(())
}
