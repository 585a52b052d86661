//! Prompt construction utilities for pipeline stages.
//!
//! [`template`] renders system prompts from `{{variable}}` templates and
//! [`schema`] describes the strict JSON objects a stage asks the completion
//! service to return.

#![warn(missing_docs, clippy::pedantic)]

pub mod schema;
pub mod template;

pub use schema::{FieldKind, OutputSchema, OutputSchemaBuilder, SchemaError, SchemaField, SchemaResult};
pub use template::{PromptTemplate, TemplateBuilder, TemplateError, TemplateResult};
