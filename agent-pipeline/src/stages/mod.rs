//! Individual completion-backed stages.
//!
//! Every stage issues exactly one call through a [`CompletionCall`], which
//! bounds the call with a timeout and turns adapter failures and
//! non-conforming payloads into [`PipelineError::Service`].

pub mod categorization;
pub mod compose;
pub mod info_request;
pub mod registration;
pub mod validation;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agent_adapters::traits::{InferenceRequest, ModelAdapter, collect_response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult, StageKind};

/// Per-call timeout applied when none is configured.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// One stage's handle on the completion service.
#[derive(Clone)]
pub struct CompletionCall {
    stage: StageKind,
    adapter: Arc<dyn ModelAdapter>,
    timeout: Duration,
    temperature: Option<f32>,
}

impl fmt::Debug for CompletionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = self.adapter.metadata();
        f.debug_struct("CompletionCall")
            .field("stage", &self.stage)
            .field("provider", &metadata.provider())
            .field("model", &metadata.model())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CompletionCall {
    /// Creates a call for `stage` using the default timeout.
    #[must_use]
    pub fn new(stage: StageKind, adapter: Arc<dyn ModelAdapter>) -> Self {
        Self {
            stage,
            adapter,
            timeout: DEFAULT_STAGE_TIMEOUT,
            temperature: None,
        }
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the sampling temperature sent with every request.
    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the stage this call belongs to.
    #[must_use]
    pub const fn stage(&self) -> StageKind {
        self.stage
    }

    /// Issues the request and returns the full response text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Service`] when the adapter fails or the call
    /// does not finish within the timeout.
    pub async fn text(&self, request: InferenceRequest) -> PipelineResult<String> {
        let request = match self.temperature {
            Some(temperature) => request.with_temperature(temperature),
            None => request,
        };
        let metadata = self.adapter.metadata();

        let call = async {
            let stream = self.adapter.infer(request).await?;
            collect_response(stream).await
        };

        let text = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                PipelineError::service(
                    self.stage,
                    format!(
                        "{} model `{}` did not respond within {}s",
                        metadata.provider(),
                        metadata.model(),
                        self.timeout.as_secs_f64()
                    ),
                )
            })?
            .map_err(|err| {
                PipelineError::service(
                    self.stage,
                    format!("{} model `{}`: {err}", metadata.provider(), metadata.model()),
                )
            })?;

        debug!(stage = %self.stage, response = %text, "stage response");
        Ok(text)
    }

    /// Issues a structured request and decodes the JSON reply.
    ///
    /// # Errors
    ///
    /// As [`CompletionCall::text`], plus [`PipelineError::Service`] when the
    /// reply does not decode into `T`.
    pub async fn json<T: DeserializeOwned>(&self, request: InferenceRequest) -> PipelineResult<T> {
        let text = self.text(request).await?;
        serde_json::from_str(text.trim()).map_err(|err| {
            PipelineError::service(
                self.stage,
                format!("response does not match the requested shape: {err}"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_adapters::scripted::ScriptedAdapter;
    use agent_adapters::traits::{AdapterMetadata, AdapterResult, AdapterStream};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Flag {
        on: bool,
    }

    fn request() -> InferenceRequest {
        InferenceRequest::new("system", "user")
    }

    #[tokio::test]
    async fn decodes_json_reply() {
        let adapter = Arc::new(ScriptedAdapter::new().then_json(&json!({"on": true})));
        let call = CompletionCall::new(StageKind::Validation, adapter);
        let flag: Flag = call.json(request()).await.unwrap();
        assert!(flag.on);
    }

    #[tokio::test]
    async fn malformed_json_is_a_service_error() {
        let adapter = Arc::new(ScriptedAdapter::new().then_text("not json"));
        let call = CompletionCall::new(StageKind::Categorization, adapter);
        let err = call.json::<Flag>(request()).await.expect_err("malformed");
        assert_eq!(err.stage(), Some(StageKind::Categorization));
    }

    #[tokio::test]
    async fn adapter_failure_names_the_model() {
        let adapter = Arc::new(ScriptedAdapter::new().then_fail("connection reset"));
        let call = CompletionCall::new(StageKind::Composition, adapter);
        let err = call.text(request()).await.expect_err("failure");
        let message = err.to_string();
        assert!(message.contains("composition"));
        assert!(message.contains("scripted"));
        assert!(message.contains("connection reset"));
    }

    #[tokio::test]
    async fn temperature_is_forwarded() {
        let adapter = Arc::new(ScriptedAdapter::new().then_text("ok"));
        let call = CompletionCall::new(StageKind::Composition, adapter.clone())
            .with_temperature(Some(0.2));
        call.text(request()).await.unwrap();
        assert_eq!(adapter.requests()[0].temperature(), Some(0.2));
    }

    struct Stalled {
        metadata: AdapterMetadata,
    }

    #[async_trait]
    impl ModelAdapter for Stalled {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn infer(&self, _request: InferenceRequest) -> AdapterResult<AdapterStream> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_calls_time_out() {
        let adapter = Arc::new(Stalled {
            metadata: AdapterMetadata::new("stalled", "none"),
        });
        let call = CompletionCall::new(StageKind::Validation, adapter)
            .with_timeout(Duration::from_millis(20));
        let err = call.text(request()).await.expect_err("timeout");
        assert!(err.to_string().contains("did not respond within 0.02s"));
    }
}
