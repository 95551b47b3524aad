//! Schema Compiler Port - Turns the form registry into DDL.
//!
//! Each form becomes one table with a column per question. Every table
//! carries a `UNIQUE(case_id, farmer)` constraint so upserts have a
//! conflict target; compilers must guarantee the constraint is present
//! even when the column list comes from a generator.

use async_trait::async_trait;

use crate::domain::registry::FormRegistry;

/// Port for compiling the registry into CREATE TABLE statements.
#[async_trait]
pub trait SchemaCompiler: Send + Sync {
    /// Produces one `CREATE TABLE IF NOT EXISTS` statement per form, in
    /// registry order.
    async fn compile(&self, registry: &FormRegistry) -> Result<Vec<String>, SchemaError>;
}

/// Schema compilation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchemaError {
    /// Generated DDL was unusable.
    #[error("invalid generated schema: {0}")]
    Invalid(String),

    /// Generator backend failed.
    #[error("schema generation failed: {0}")]
    Backend(String),
}

impl SchemaError {
    pub fn invalid(message: impl Into<String>) -> Self {
        SchemaError::Invalid(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        SchemaError::Backend(message.into())
    }
}
