//! Category and confidence classification.

use std::fmt;

use agent_adapters::traits::InferenceRequest;
use agent_prompts::{FieldKind, OutputSchema, PromptTemplate, SchemaResult, TemplateResult};
use serde::{Deserialize, Serialize};

use super::CompletionCall;
use crate::error::PipelineResult;

const CATEGORIZER_TEMPLATE: &str = "Classify user requests into registration, info_request, or other. \
Events:\n{{events}}. Use confidence to indicate how confident you are in your classification. \
Confidence should be a number between 0 and 1. 1 is the highest confidence.";

/// Kind of request the user made.
///
/// Values outside the known set are kept verbatim so routing can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// Sign an attendee up for an event.
    Registration,
    /// Ask about events or attendees.
    InfoRequest,
    /// In domain but neither of the above.
    Other,
    /// Anything else the service returned.
    Unrecognized(String),
}

impl Category {
    /// Returns the wire label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registration => "registration",
            Self::InfoRequest => "info_request",
            Self::Other => "other",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "registration" => Self::Registration,
            "info_request" => Self::InfoRequest,
            "other" => Self::Other,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Unrecognized(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category paired with the service's self-reported confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorization {
    /// Request kind.
    pub category: Category,
    /// Confidence in `[0, 1]` as reported; not clamped.
    pub confidence: f64,
}

/// System prompt template; `{{events}}` receives the catalog context.
///
/// # Errors
///
/// Never fails for the fixed template; the result type follows the builder.
pub fn prompt() -> TemplateResult<PromptTemplate> {
    PromptTemplate::builder(CATEGORIZER_TEMPLATE)
        .with_required_variable("events")
        .build()
}

/// Schema requested from the completion service.
///
/// # Errors
///
/// Never fails for the fixed field set; the result type follows the builder.
pub fn schema() -> SchemaResult<OutputSchema> {
    OutputSchema::builder("categorization_response")
        .described_field(
            "category",
            FieldKind::String,
            "One of: registration, info_request, other",
        )
        .field("confidence", FieldKind::Number)
        .build()
}

/// Second stage: classifies a validated request.
#[derive(Debug, Clone)]
pub struct CategorizationStage {
    call: CompletionCall,
}

impl CategorizationStage {
    /// Creates the stage around a completion call.
    #[must_use]
    pub const fn new(call: CompletionCall) -> Self {
        Self { call }
    }

    /// Classifies `text`, embedding the catalog in the system prompt.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`](crate::PipelineError::Service) on
    /// call failure or a reply without both fields.
    pub async fn categorize(&self, text: &str, catalog: &str) -> PipelineResult<Categorization> {
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

    #[test]
    fn parses_known_and_unknown_labels() {
        assert_eq!(Category::from("Registration ".to_owned()), Category::Registration);
        assert_eq!(Category::from("info_request".to_owned()), Category::InfoRequest);
        assert_eq!(
            Category::from("feedback".to_owned()),
            Category::Unrecognized("feedback".to_owned())
        );
        assert_eq!(String::from(Category::Other), "other");
    }

    #[test]
    fn unknown_category_survives_decoding() {
        let parsed: Categorization =
            serde_json::from_value(json!({"category": "spam", "confidence": 0.9})).unwrap();
        assert_eq!(parsed.category.as_str(), "spam");
    }

    #[tokio::test]
    async fn embeds_catalog_in_prompt() {
        let adapter = Arc::new(
            ScriptedAdapter::new()
                .then_json(&json!({"category": "registration", "confidence": 0.95})),
        );
        let stage = CategorizationStage::new(CompletionCall::new(
            StageKind::Categorization,
            adapter.clone(),
        ));

        let result = stage
            .categorize("Sign me up", "1: Developer Meetup\n2: AI Conference")
            .await
            .unwrap();
        assert_eq!(result.category, Category::Registration);
        assert!((result.confidence - 0.95).abs() < f64::EPSILON);

        let prompt = adapter.requests()[0].instructions().to_owned();
        assert!(prompt.contains("Events:\n1: Developer Meetup\n2: AI Conference."));
    }

    #[tokio::test]
    async fn missing_confidence_is_a_service_error() {
        let adapter = Arc::new(ScriptedAdapter::new().then_json(&json!({"category": "other"})));
        let stage =
            CategorizationStage::new(CompletionCall::new(StageKind::Categorization, adapter));
        let err = stage.categorize("x", "").await.expect_err("missing field");
        assert_eq!(err.stage(), Some(StageKind::Categorization));
    }
}
