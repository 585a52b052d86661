//! Hosted chat-completions adapter.
//!
//! Requests carrying an [`OutputSchema`](agent_prompts::OutputSchema) are sent
//! with a strict `json_schema` response format, so the reply is exactly one
//! object of that shape or a refusal.

use std::{env, fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::{StatusCode, Uri};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::http_client::{Exchange, HttpsTransport};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter,
};

/// Environment variable holding the API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/";
const COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Where and how to reach the completions endpoint.
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("api_key_set", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Targets `model` on the public endpoint with a 60s request timeout and
    /// no API key.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            default_temperature: None,
        }
    }

    /// Like [`OpenAiConfig::new`], taking the key from `OPENAI_API_KEY` when it
    /// is set and non-blank.
    #[must_use]
    pub fn from_env(model: impl Into<String>) -> Self {
        let key = env::var(OPENAI_API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Self {
            api_key: key,
            ..Self::new(model)
        }
    }

    /// Points the adapter at a compatible server.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] unless `base_url` is an
    /// absolute `http` or `https` URL.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = normalise_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Temperature for requests that do not set their own.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Bounds each HTTP exchange.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses `key` instead of the environment.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// [`ModelAdapter`] over `POST v1/chat/completions`.
pub struct OpenAiAdapter {
    transport: HttpsTransport,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when no API key was supplied.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let Some(api_key) = config.api_key else {
            return Err(AdapterError::configuration(format!(
                "no API key; set {OPENAI_API_KEY_ENV}"
            )));
        };
        let endpoint = format!("{}{COMPLETIONS_PATH}", config.base_url)
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("bad endpoint: {err}")))?;

        Ok(Self {
            transport: HttpsTransport::new(config.timeout),
            endpoint,
            metadata: AdapterMetadata::new("openai", config.model),
            api_key,
            default_temperature: config.default_temperature,
        })
    }

    fn body_for<'a>(&'a self, request: &'a InferenceRequest) -> ChatBody<'a> {
        ChatBody {
            model: self.metadata.model(),
            messages: [
                ChatTurn {
                    role: "system",
                    content: request.instructions(),
                },
                ChatTurn {
                    role: "user",
                    content: request.input(),
                },
            ],
            temperature: request.temperature().or(self.default_temperature),
            response_format: request.response_schema().map(|schema| ResponseFormat {
                kind: "json_schema",
                json_schema: NamedSchema {
                    name: schema.name(),
                    schema: schema.json_schema(),
                    strict: true,
                },
            }),
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let body = self.body_for(&request);
        debug!(
            model = %self.metadata.model(),
            schema = body.response_format.as_ref().map(|format| format.json_schema.name),
            "chat completion"
        );
        let encoded = serde_json::to_vec(&body)
            .map_err(|err| AdapterError::configuration(format!("unencodable request: {err}")))?;

        let exchange = self
            .transport
            .post_json(&self.endpoint, &self.api_key, encoded)
            .await?;
        let content = reply_content(exchange)?;
        Ok(Box::pin(stream::once(async move {
            Ok(InferenceChunk::complete(content))
        })))
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatTurn<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: NamedSchema<'a>,
}

#[derive(Serialize)]
struct NamedSchema<'a> {
    name: &'a str,
    schema: Value,
    strict: bool,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Reply>,
}

#[derive(Deserialize)]
struct Reply {
    content: Option<String>,
    refusal: Option<String>,
}

fn reply_content(exchange: Exchange) -> AdapterResult<String> {
    if exchange.status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AdapterError::RateLimited {
            retry_after: exchange.retry_after,
        });
    }
    if !exchange.status.is_success() {
        return Err(AdapterError::Status {
            status: exchange.status.as_u16(),
            body: String::from_utf8_lossy(&exchange.body).into_owned(),
        });
    }

    let completion: Completion = serde_json::from_slice(&exchange.body)
        .map_err(|err| AdapterError::malformed(err.to_string()))?;
    let reply = completion
        .choices
        .into_iter()
        .find_map(|choice| choice.message)
        .ok_or_else(|| AdapterError::malformed("no choices"))?;

    match reply.refusal {
        Some(reason) if !reason.is_empty() => Err(AdapterError::Refused { reason }),
        _ => Ok(reply.content.unwrap_or_default()),
    }
}

fn normalise_base_url(input: &str) -> AdapterResult<String> {
    let trimmed = input.trim();
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(AdapterError::configuration(format!(
            "base URL `{trimmed}` needs an http:// or https:// scheme"
        )));
    }
    let base = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    base.parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("base URL `{trimmed}`: {err}")))?;
    Ok(base)
}
