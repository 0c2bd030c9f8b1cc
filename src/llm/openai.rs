//! OpenAI-compatible LLM client implementation.
//!
//! Speaks the chat completions API, which both OpenAI and a local LM Studio
//! server expose. Requests are non-streaming and are sent exactly once.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WardenError};
use crate::llm::http::{self, Reply};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Sampling temperature for correction calls.
const TEMPERATURE: f32 = 0.1;

/// OpenAI API endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// LM Studio's local endpoint.
pub const LM_STUDIO_API_URL: &str = "http://localhost:1234/v1/chat/completions";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_url: String,
    /// API key, sent as a bearer token when present.
    pub api_key: Option<String>,
    /// Model to use. LM Studio serves whatever model is loaded when unset.
    pub model: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Creates a config for the OpenAI API.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: OPENAI_API_URL.to_string(),
            api_key: Some(api_key.into()),
            model: Some(model.into()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Creates a config for a local LM Studio server.
    pub fn lm_studio() -> Self {
        Self {
            api_url: LM_STUDIO_API_URL.to_string(),
            api_key: None,
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Sets the endpoint URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// OpenAI-compatible LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = http::build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    /// Returns the endpoint URL.
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: self.config.model.as_deref(),
            messages,
            temperature: TEMPERATURE,
            stream: false,
        }
    }

    /// Parses an API error response.
    fn parse_error(status: StatusCode, body: &str) -> WardenError {
        if status == StatusCode::UNAUTHORIZED {
            return WardenError::llm("Authentication failed. Check your OPENAI_API_KEY.");
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return WardenError::llm("Rate limited. Please wait and try again.");
        }

        if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(body) {
            return WardenError::llm(format!(
                "Chat completions API error: {}",
                error_response.error.message
            ));
        }

        WardenError::llm(format!("Chat completions API error ({status}): {body}"))
    }

    /// First choice's content. A reply without choices reads as empty text,
    /// which then yields no extractable statement.
    fn read_reply(reply: Reply) -> Result<String> {
        if !reply.status.is_success() {
            return Err(Self::parse_error(reply.status, &reply.body));
        }

        let response: ChatResponse = http::decode(&reply.body, "chat completions API")?;
        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        debug!("Sending correction request to {}", self.config.api_url);

        let mut request = self
            .client
            .post(&self.config.api_url)
            .json(&self.build_request(messages));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let reply = http::send_once(request, &self.config.api_url, self.config.timeout_secs).await?;
        Self::read_reply(reply)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
