//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{Result, WardenError};
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    LlmClient, LlmProvider, MockLlmClient, OllamaClient, OllamaConfig, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client from resolved settings.
///
/// Environment overrides are applied to `config` beforehand; see
/// [`LlmConfig::apply_env`].
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider {
        LlmProvider::LmStudio => {
            let mut settings = OpenAiConfig::lm_studio().with_timeout(config.timeout_secs);
            if let Some(url) = &config.base_url {
                settings = settings.with_url(url.clone());
            }
            if let Some(model) = &config.model {
                settings = settings.with_model(model.clone());
            }
            Ok(Box::new(OpenAiClient::new(settings)?))
        }
        LlmProvider::OpenAi => {
            let key = config.api_key.clone().ok_or_else(|| {
                WardenError::llm("No API key configured. Set OPENAI_API_KEY or [llm] api_key.")
            })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            let mut settings = OpenAiConfig::openai(key, model).with_timeout(config.timeout_secs);
            if let Some(url) = &config.base_url {
                settings = settings.with_url(url.clone());
            }
            Ok(Box::new(OpenAiClient::new(settings)?))
        }
        LlmProvider::Ollama => {
            let mut settings = OllamaConfig::default().with_timeout(config.timeout_secs);
            if let Some(model) = &config.model {
                settings.model = model.clone();
            }
            if let Some(url) = &config.base_url {
                settings = settings.with_url(url.clone());
            }
            Ok(Box::new(OllamaClient::new(settings)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
