//! Final natural-language rendering.

use agent_adapters::traits::InferenceRequest;
use agent_prompts::PromptTemplate;

use super::CompletionCall;
use crate::error::{PipelineError, PipelineResult};
use crate::routing::RouteResult;
use crate::stages::categorization::Category;

const COMPOSER_TEMPLATE: &str = "Compose a clear user-facing message for category '{{category}}'.";

/// Turns a routing result into the message shown to the user.
#[derive(Debug, Clone)]
pub struct ComposeStage {
    call: CompletionCall,
}

impl ComposeStage {
    /// Creates the stage around a completion call.
    #[must_use]
    pub const fn new(call: CompletionCall) -> Self {
        Self { call }
    }

    /// Composes the message. Free text, no schema; the user turn is the JSON
    /// form of `result`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`] on call failure or an empty reply.
    pub async fn compose(&self, result: &RouteResult, category: &Category) -> PipelineResult<String> {
        let system = PromptTemplate::builder(COMPOSER_TEMPLATE)
            .with_required_variable("category")
            .build()?
            .render_pairs(&[("category", category.as_str())])?;
        let payload = serde_json::to_string(result)?;

        let message = self
            .call
            .text(InferenceRequest::new(system, payload))
            .await?;
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::service(
                self.call.stage(),
                "composed message is empty",
            ));
        }
        Ok(message.to_owned())
    }
}
