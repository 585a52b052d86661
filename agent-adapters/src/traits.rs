//! The completion capability every stage calls through.
//!
//! A stage sends one [`InferenceRequest`] (instructions plus the text to work
//! on, optionally constrained by an [`OutputSchema`]) and drains the
//! [`AdapterStream`] it gets back with [`collect_response`].

use std::pin::Pin;
use std::time::Duration;

use agent_prompts::OutputSchema;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::Serialize;
use thiserror::Error;

/// Result alias used by model adapters.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Reply fragments produced by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Ways a completion call can fail.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Missing credentials, a bad endpoint, or an exhausted script.
    #[error("adapter not configured: {reason}")]
    Configuration {
        /// What is missing.
        reason: String,
    },

    /// The request never produced an HTTP response.
    #[error("transport failure: {reason}")]
    Transport {
        /// Underlying I/O or TLS message.
        reason: String,
    },

    /// No response arrived within the request timeout.
    #[error("no response after {}s", after.as_secs_f64())]
    TimedOut {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The provider throttled the call.
    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Delay suggested by the provider, when it sent one.
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status.
    #[error("provider answered {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// The model declined to produce the requested output.
    #[error("model refused: {reason}")]
    Refused {
        /// Refusal text returned by the model.
        reason: String,
    },

    /// The response body could not be understood.
    #[error("unreadable provider response: {reason}")]
    Malformed {
        /// Decoder message.
        reason: String,
    },
}

impl AdapterError {
    /// Builds a [`AdapterError::Configuration`].
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Builds a [`AdapterError::Transport`].
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Builds a [`AdapterError::Malformed`].
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Identifies the provider and model behind an adapter, for logs and errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: &'static str,
    model: String,
}

impl AdapterMetadata {
    /// Describes `model` served by `provider`.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Provider label such as `openai`.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Model identifier sent with each call.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// One completion call: instructions for the model and the text they apply to.
///
/// With a response schema attached the adapter must return a single JSON
/// object conforming to it. Without one the reply is free text.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct InferenceRequest {
    instructions: String,
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<OutputSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl InferenceRequest {
    /// Sends `input` under `instructions`.
    #[must_use]
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            input: input.into(),
            response_schema: None,
            temperature: None,
        }
    }

    /// Constrains the reply to `schema`.
    #[must_use]
    pub fn with_response_schema(mut self, schema: OutputSchema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// Overrides the adapter's sampling temperature for this call.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Instructions sent ahead of the input.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The text being worked on.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Schema the reply must conform to.
    #[must_use]
    pub fn response_schema(&self) -> Option<&OutputSchema> {
        self.response_schema.as_ref()
    }

    /// Per-call temperature override.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// A fragment of a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceChunk {
    /// Text carried by this fragment.
    pub delta: String,
    /// Set on the final fragment.
    pub done: bool,
}

impl InferenceChunk {
    /// A fragment carrying `delta`.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
        }
    }

    /// A complete reply delivered as one fragment.
    #[must_use]
    pub fn complete(text: impl Into<String>) -> Self {
        Self::new(text, true)
    }
}

/// A completion service the pipeline can call.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Provider and model behind this adapter.
    fn metadata(&self) -> &AdapterMetadata;

    /// Starts the call and returns its reply stream.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;
}

/// Joins reply fragments up to and including the first one marked `done`.
///
/// # Errors
///
/// Returns the first error the stream yields.
pub async fn collect_response(mut stream: AdapterStream) -> AdapterResult<String> {
    let mut reply = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        reply.push_str(&chunk.delta);
        if chunk.done {
            break;
        }
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_prompts::FieldKind;
    use futures::stream;

    #[test]
    fn structured_request_keeps_schema_and_temperature() {
        let schema = OutputSchema::builder("validation_response")
            .field("valid", FieldKind::Boolean)
            .build()
            .unwrap();
        let request = InferenceRequest::new("validate", "register me")
            .with_response_schema(schema)
            .with_temperature(0.0);

        assert_eq!(request.instructions(), "validate");
        assert_eq!(request.input(), "register me");
        assert_eq!(
            request.response_schema().map(OutputSchema::name),
            Some("validation_response")
        );
        assert_eq!(request.temperature(), Some(0.0));
    }

    #[test]
    fn timeout_message_names_the_duration() {
        let err = AdapterError::TimedOut {
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "no response after 1.5s");
    }

    #[tokio::test]
    async fn stops_at_the_final_fragment() {
        let chunks = vec![
            Ok(InferenceChunk::new("{\"valid\":", false)),
            Ok(InferenceChunk::complete("true}")),
            Ok(InferenceChunk::complete("ignored")),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));
        assert_eq!(collect_response(stream).await.unwrap(), "{\"valid\":true}");
    }

    #[tokio::test]
    async fn stream_errors_surface() {
        let chunks = vec![
            Ok(InferenceChunk::new("partial", false)),
            Err(AdapterError::transport("reset")),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));
        let err = collect_response(stream).await.expect_err("error chunk");
        assert!(matches!(err, AdapterError::Transport { .. }));
    }
}
