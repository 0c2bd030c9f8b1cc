//! Ollama chat client.
//!
//! Uses the non-streaming `/api/chat` endpoint of a local or LAN Ollama
//! server. No key is needed.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, WardenError};
use crate::llm::http::{self, Reply};
use crate::llm::openai::DEFAULT_TIMEOUT_SECS;
use crate::llm::types::Message;
use crate::llm::LlmClient;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

const TEMPERATURE: f32 = 0.1;

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server base URL, without the `/api/chat` path.
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl OllamaConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_MODEL)
    }
}

#[derive(Debug, Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = http::build_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: TEMPERATURE,
            },
        }
    }

    /// Turns a finished exchange into the reply text.
    fn read_reply(&self, reply: Reply) -> Result<String> {
        if !reply.status.is_success() {
            // Ollama reports errors as {"error": "..."}.
            let detail = serde_json::from_str::<ErrorBody>(&reply.body)
                .map(|b| b.error)
                .unwrap_or(reply.body);
            return Err(WardenError::llm(format!(
                "Ollama error ({}) for model '{}': {}",
                reply.status, self.config.model, detail
            )));
        }

        let response: ChatResponse = http::decode(&reply.body, "Ollama")?;
        Ok(response.message.content)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = self.config.chat_url();
        debug!("Sending correction request to Ollama model {} at {}", self.config.model, url);

        let request = self.client.post(&url).json(&self.build_request(messages));
        let reply = http::send_once(request, "Ollama", self.config.timeout_secs).await?;
        self.read_reply(reply)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn reply(status: StatusCode, body: &str) -> Reply {
        Reply {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_chat_url_trims_trailing_slash() {
        let config = OllamaConfig::new("codellama").with_url("http://gpu-box:11434/");
        assert_eq!(config.chat_url(), "http://gpu-box:11434/api/chat");
    }

    #[test]
    fn test_request_body() {
        let client = OllamaClient::new(OllamaConfig::new("codellama")).unwrap();
        let messages = [Message::system("Fix SQL."), Message::user("broken")];
        let json = serde_json::to_value(client.build_request(&messages)).unwrap();

        assert_eq!(json["model"], "codellama");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][1]["role"], "user");
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_read_reply_content() {
        let client = OllamaClient::new(OllamaConfig::default()).unwrap();
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"```sql\nSELECT 1\n```"},"done":true}"#;
        assert_eq!(
            client.read_reply(reply(StatusCode::OK, body)).unwrap(),
            "```sql\nSELECT 1\n```"
        );
    }

    #[test]
    fn test_read_reply_error_body() {
        let client = OllamaClient::new(OllamaConfig::new("missing")).unwrap();
        let err = client
            .read_reply(reply(
                StatusCode::NOT_FOUND,
                r#"{"error":"model 'missing' not found"}"#,
            ))
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("model 'missing' not found"));
    }
}
