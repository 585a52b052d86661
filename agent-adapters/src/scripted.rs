//! Deterministic adapter that replays canned responses.
//!
//! Used by tests and offline runs: each call to [`ModelAdapter::infer`] pops
//! the next scripted reply and records the request that consumed it.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;

use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter,
};

#[derive(Debug)]
enum Reply {
    Text(String),
    Failure(String),
}

/// Adapter returning pre-recorded replies in order.
#[derive(Debug)]
pub struct ScriptedAdapter {
    metadata: AdapterMetadata,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedAdapter {
    /// Creates an adapter with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: AdapterMetadata::new("scripted", "canned"),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queues a free-text reply.
    #[must_use]
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queues a JSON reply, as a structured-output provider would return it.
    #[must_use]
    pub fn then_json(self, value: &Value) -> Self {
        self.push(Reply::Text(value.to_string()));
        self
    }

    /// Queues a transport failure.
    #[must_use]
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(Reply::Failure(reason.into()));
        self
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<InferenceRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Returns the number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// Returns the number of replies not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut guard) = self.replies.lock() {
            guard.push_back(reply);
        }
    }
}

impl Default for ScriptedAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        self.requests
            .lock()
            .map_err(|_| AdapterError::transport("scripted request log poisoned"))?
            .push(request);

        let reply = self
            .replies
            .lock()
            .map_err(|_| AdapterError::transport("scripted replies poisoned"))?
            .pop_front();

        match reply {
            Some(Reply::Text(text)) => {
                Ok(Box::pin(stream::once(async move {
                    Ok(InferenceChunk::complete(text))
                })))
            }
            Some(Reply::Failure(reason)) => Err(AdapterError::transport(reason)),
            None => Err(AdapterError::configuration("scripted adapter has no reply left")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::collect_response;
    use serde_json::json;

    #[tokio::test]
    async fn replays_in_order_and_records_requests() {
        let adapter = ScriptedAdapter::new()
            .then_json(&json!({"valid": true, "reason": ""}))
            .then_text("Done!");

        let first = adapter
            .infer(InferenceRequest::new("validate", "hello"))
            .await
            .unwrap();
        assert_eq!(
            collect_response(first).await.unwrap(),
            r#"{"reason":"","valid":true}"#
        );

        let second = adapter
            .infer(InferenceRequest::new("compose", "{}"))
            .await
            .unwrap();
        assert_eq!(collect_response(second).await.unwrap(), "Done!");

        assert_eq!(adapter.call_count(), 2);
        assert_eq!(adapter.requests()[1].instructions(), "compose");
        assert_eq!(adapter.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_script_and_failures_are_errors() {
        let adapter = ScriptedAdapter::new().then_fail("connection reset");

        let err = adapter
            .infer(InferenceRequest::new("a", "b"))
            .await
            .err()
            .expect("scripted failure");
        assert!(matches!(err, AdapterError::Transport { .. }));

        let err = adapter
            .infer(InferenceRequest::new("a", "b"))
            .await
            .err()
            .expect("empty script");
        assert!(matches!(err, AdapterError::Configuration { .. }));
        assert_eq!(adapter.call_count(), 2);
    }
}
