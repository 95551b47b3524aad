//! Schema compilers.
//!
//! `StaticSchemaCompiler` derives DDL from the registry directly and is
//! the default. `LlmSchemaCompiler` asks a chat model to draft the DDL
//! instead; its output is checked and the `UNIQUE (case_id, farmer)`
//! conflict target is injected if the model left it out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::registry::{FormDefinition, FormRegistry, ValueKind};
use crate::ports::{
    AiProvider, CompletionRequest, MessageRole, SchemaCompiler, SchemaError,
};

const UNIQUE_CONSTRAINT: &str = "UNIQUE (case_id, farmer)";

/// Deterministic registry-to-DDL compiler.
pub struct StaticSchemaCompiler;

impl StaticSchemaCompiler {
    fn table_ddl(form: &FormDefinition) -> String {
        let mut columns = vec![
            "id BIGSERIAL PRIMARY KEY".to_string(),
            "case_id UUID NOT NULL".to_string(),
            "farmer TEXT NOT NULL".to_string(),
        ];
        for q in form.questions() {
            let sql_type = match q.kind() {
                ValueKind::Text => "TEXT",
                ValueKind::Integer => "BIGINT",
            };
            columns.push(format!("{} {}", q.column_name(), sql_type));
        }
        columns.push("created_at TIMESTAMPTZ NOT NULL DEFAULT now()".to_string());
        columns.push("updated_at TIMESTAMPTZ NOT NULL DEFAULT now()".to_string());
        columns.push(UNIQUE_CONSTRAINT.to_string());

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            form.table_name(),
            columns.join(",\n    ")
        )
    }
}

#[async_trait]
impl SchemaCompiler for StaticSchemaCompiler {
    async fn compile(&self, registry: &FormRegistry) -> Result<Vec<String>, SchemaError> {
        Ok(registry.forms().iter().map(Self::table_ddl).collect())
    }
}

/// Compiler that drafts DDL with a chat model.
///
/// Kept for parity with deployments where the form set is edited by
/// non-engineers and the model fills in column types. Output is never
/// trusted as-is.
pub struct LlmSchemaCompiler {
    provider: Arc<dyn AiProvider>,
}

impl LlmSchemaCompiler {
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    fn prompt(registry: &FormRegistry) -> String {
        let mut lines = vec![
            "Write one PostgreSQL CREATE TABLE IF NOT EXISTS statement per form below."
                .to_string(),
            "Every table needs: id BIGSERIAL PRIMARY KEY, case_id UUID NOT NULL, \
             farmer TEXT NOT NULL, created_at/updated_at TIMESTAMPTZ, and one nullable \
             column per question (snake_case the question text)."
                .to_string(),
            "Separate statements with a line containing only ';'. No commentary.".to_string(),
        ];
        for form in registry.forms() {
            lines.push(format!("Form {}:", form.table_name()));
            for q in form.questions() {
                let kind = match q.kind() {
                    ValueKind::Text => "text",
                    ValueKind::Integer => "integer",
                };
                lines.push(format!("- {} ({})", q.key(), kind));
            }
        }
        lines.join("\n")
    }

    /// Guarantees the upsert conflict target is present.
    fn ensure_unique_constraint(statement: &str) -> Result<String, SchemaError> {
        if statement.to_ascii_uppercase().contains("UNIQUE") {
            return Ok(statement.to_string());
        }
        let close = statement
            .rfind(')')
            .ok_or_else(|| SchemaError::invalid("statement has no closing parenthesis"))?;
        let mut fixed = statement.to_string();
        fixed.insert_str(close, &format!(",\n    {}\n", UNIQUE_CONSTRAINT));
        Ok(fixed)
    }

    fn validate(statement: &str, registry: &FormRegistry) -> Result<(), SchemaError> {
        let upper = statement.to_ascii_uppercase();
        if !upper.trim_start().starts_with("CREATE TABLE") {
            return Err(SchemaError::invalid(format!(
                "not a CREATE TABLE statement: {}",
                statement.lines().next().unwrap_or_default()
            )));
        }
        if !statement.contains("case_id") || !statement.contains("farmer") {
            return Err(SchemaError::invalid("missing case_id or farmer column"));
        }
        if !registry
            .forms()
            .iter()
            .any(|f| statement.contains(f.table_name()))
        {
            return Err(SchemaError::invalid("statement names no registry table"));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaCompiler for LlmSchemaCompiler {
    async fn compile(&self, registry: &FormRegistry) -> Result<Vec<String>, SchemaError> {
        let request = CompletionRequest::new()
            .with_message(MessageRole::User, Self::prompt(registry))
            .with_temperature(0.0);
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| SchemaError::backend(e.to_string()))?;

        let mut statements = Vec::new();
        for raw in response.content.split("\n;").flat_map(|s| s.split(";\n")) {
            let raw = raw.trim().trim_matches('`').trim();
            if raw.is_empty() {
                continue;
            }
            Self::validate(raw, registry)?;
            statements.push(Self::ensure_unique_constraint(raw)?);
        }

        if statements.len() != registry.forms().len() {
            warn!(
                expected = registry.forms().len(),
                got = statements.len(),
                "generated schema has wrong statement count"
            );
            return Err(SchemaError::invalid(format!(
                "expected {} statements, got {}",
                registry.forms().len(),
                statements.len()
            )));
        }
        Ok(statements)
    }
}
