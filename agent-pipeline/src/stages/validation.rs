//! Domain relevance check.

use agent_adapters::traits::InferenceRequest;
use agent_prompts::{FieldKind, OutputSchema, SchemaResult};
use serde::{Deserialize, Serialize};

use super::CompletionCall;
use crate::error::PipelineResult;

const VALIDATOR_PROMPT: &str = "You are a domain-specific validator for an events management system. \
Your job is to validate whether the user's input is relevant to event management in any way. \
Instructions:\n\
- Return valid=True if the input is relevant to event management in any way.\n\
- Return valid=False if the input is irrelevant, ambiguous, or cannot be mapped to the domain.\n";

/// Verdict on whether a request belongs to the events domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `true` when the input is relevant to event management.
    pub valid: bool,
    /// Short explanation, mostly useful when `valid` is false.
    pub reason: String,
}

/// Schema requested from the completion service.
///
/// # Errors
///
/// Never fails for the fixed field set; the result type follows the builder.
pub fn schema() -> SchemaResult<OutputSchema> {
    OutputSchema::builder("validation_response")
        .field("valid", FieldKind::Boolean)
        .field("reason", FieldKind::String)
        .build()
}

/// First stage of every run.
#[derive(Debug, Clone)]
pub struct ValidationStage {
    call: CompletionCall,
}

impl ValidationStage {
    /// Creates the stage around a completion call.
    #[must_use]
    pub const fn new(call: CompletionCall) -> Self {
        Self { call }
    }

    /// Asks the service whether `text` is an events-domain request.
    ///
    /// Empty input is sent as-is; the service decides.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`](crate::PipelineError::Service) if the
    /// call fails or the reply is not a validation verdict. A failed call
    /// never counts as valid.
    pub async fn validate(&self, text: &str) -> PipelineResult<ValidationResult> {
        let request = InferenceRequest::new(VALIDATOR_PROMPT, text)
            .with_response_schema(schema()?);
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

    fn stage(adapter: &Arc<ScriptedAdapter>) -> ValidationStage {
        ValidationStage::new(CompletionCall::new(StageKind::Validation, adapter.clone()))
    }

    #[tokio::test]
    async fn sends_the_raw_text_under_the_validator_prompt() {
        let adapter = Arc::new(
            ScriptedAdapter::new().then_json(&json!({"valid": true, "reason": "event request"})),
        );
        let verdict = stage(&adapter).validate("Register me").await.unwrap();
        assert!(verdict.valid);

        let requests = adapter.requests();
        let request = &requests[0];
        assert_eq!(request.instructions(), VALIDATOR_PROMPT);
        assert_eq!(request.input(), "Register me");
        assert_eq!(
            request.response_schema().map(OutputSchema::name),
            Some("validation_response")
        );
    }

    #[tokio::test]
    async fn partial_reply_is_not_treated_as_valid() {
        let adapter = Arc::new(ScriptedAdapter::new().then_json(&json!({"valid": true})));
        let err = stage(&adapter).validate("hello").await.expect_err("missing reason");
        assert_eq!(err.stage(), Some(StageKind::Validation));
    }

    #[tokio::test]
    async fn empty_input_still_reaches_the_service() {
        let adapter = Arc::new(
            ScriptedAdapter::new().then_json(&json!({"valid": false, "reason": "empty"})),
        );
        let verdict = stage(&adapter).validate("").await.unwrap();
        assert!(!verdict.valid);
        assert_eq!(adapter.call_count(), 1);
    }
}
