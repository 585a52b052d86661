//! Registration field extraction.

use agent_adapters::traits::InferenceRequest;
use agent_prompts::{FieldKind, OutputSchema, PromptTemplate, SchemaResult, TemplateResult};
use serde::{Deserialize, Serialize};

use super::CompletionCall;
use crate::error::PipelineResult;

const EXTRACTOR_TEMPLATE: &str =
    "Extract event_name, name, and email from this text. Events:\n{{events}}";

/// Fields needed to register an attendee. Not validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Event the user wants to attend, as they named it.
    pub event_name: String,
    /// Attendee name.
    #[serde(rename = "name")]
    pub attendee_name: String,
    /// Attendee email.
    #[serde(rename = "email")]
    pub attendee_email: String,
}

/// System prompt template; `{{events}}` receives the catalog context.
///
/// # Errors
///
/// Never fails for the fixed template; the result type follows the builder.
pub fn prompt() -> TemplateResult<PromptTemplate> {
    PromptTemplate::builder(EXTRACTOR_TEMPLATE)
        .with_required_variable("events")
        .build()
}

/// Schema requested from the completion service.
///
/// # Errors
///
/// Never fails for the fixed field set; the result type follows the builder.
pub fn schema() -> SchemaResult<OutputSchema> {
    OutputSchema::builder("registration_extraction")
        .field("event_name", FieldKind::String)
        .field("name", FieldKind::String)
        .field("email", FieldKind::String)
        .build()
}

/// Pulls registration fields out of free text.
#[derive(Debug, Clone)]
pub struct RegistrationStage {
    call: CompletionCall,
}

impl RegistrationStage {
    /// Creates the stage around a completion call.
    #[must_use]
    pub const fn new(call: CompletionCall) -> Self {
        Self { call }
    }

    /// Extracts event, name, and email from `text`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`](crate::PipelineError::Service) on
    /// call failure or when any of the three keys is missing.
    pub async fn extract(&self, text: &str, catalog: &str) -> PipelineResult<RegistrationRequest> {
        let system = prompt()?.render_pairs(&[("events", catalog)])?;
        let request =
            InferenceRequest::new(system, text).with_response_schema(schema()?);
        self.call.json(request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agent_adapters::scripted::ScriptedAdapter;
    use serde_json::json;

    use super::*;
    use crate::error::StageKind;

    #[tokio::test]
    async fn decodes_wire_keys() {
        let adapter = Arc::new(ScriptedAdapter::new().then_json(&json!({
            "event_name": "Developer Meetup",
            "name": "Alice",
            "email": "alice@x.com"
        })));
        let stage = RegistrationStage::new(CompletionCall::new(
            StageKind::RegistrationExtraction,
            adapter.clone(),
        ));

        let request = stage
            .extract("Register Alice", "1: Developer Meetup")
            .await
            .unwrap();
        assert_eq!(request.event_name, "Developer Meetup");
        assert_eq!(request.attendee_name, "Alice");
        assert_eq!(request.attendee_email, "alice@x.com");
        assert_eq!(
            adapter.requests()[0].instructions(),
            "Extract event_name, name, and email from this text. Events:\n1: Developer Meetup"
        );
    }

    #[tokio::test]
    async fn missing_email_is_a_service_error() {
        let adapter = Arc::new(
            ScriptedAdapter::new().then_json(&json!({"event_name": "AI Conference", "name": "Bo"})),
        );
        let stage =
            RegistrationStage::new(CompletionCall::new(StageKind::RegistrationExtraction, adapter));
        let err = stage.extract("x", "").await.expect_err("missing email");
        assert_eq!(err.stage(), Some(StageKind::RegistrationExtraction));
    }
}
