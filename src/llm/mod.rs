//! The generation service that proposes corrected statements.
//!
//! The pipeline only sees [`LlmClient`]. Concrete clients cover LM Studio and
//! OpenAI (both chat completions), Ollama, and a scripted mock.

pub mod factory;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use factory::create_client;
pub use mock::MockLlmClient;
pub use ollama::{OllamaClient, OllamaConfig};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::{extract_sql, parse_llm_response, ParsedResponse};
pub use prompt::{hint_for, CorrectionRequest, CORRECTION_SYSTEM_PROMPT};
pub use types::{last_user_content, Message, Role};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Result;

/// A chat model reachable over some transport.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one chat request and returns the full reply text. Called at
    /// most once per failed statement; implementations must not retry.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Which client `create_client` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local LM Studio server (OpenAI-compatible, no key)
    #[default]
    LmStudio,
    /// OpenAI
    OpenAi,
    /// Local Ollama instance
    Ollama,
    /// Mock client for testing (no server required)
    Mock,
}

impl LlmProvider {
    /// Name used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LmStudio => "lmstudio",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(Self::LmStudio),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "mock" => Ok(Self::Mock),
            _ => Err(format!(
                "Unknown LLM provider: {s}. Expected: lmstudio, openai, ollama or mock"
            )),
        }
    }
}

impl std::fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
