//! AI adapters: provider client, gateway validator, schema compilers.

mod llm_validator;
mod openai_provider;
mod sql_compiler;

pub use llm_validator::LlmValidator;
pub use openai_provider::{OpenAiConfig, OpenAiProvider};
pub use sql_compiler::{LlmSchemaCompiler, StaticSchemaCompiler};
