//! Configuration management for sqlwarden.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Precedence is CLI flag, then environment, then file, then built-in default.

use crate::db::DEFAULT_MAX_ROWS;
use crate::error::{Result, WardenError};
use crate::llm::openai::DEFAULT_TIMEOUT_SECS;
use crate::llm::LlmProvider;
use crate::safety::{PragmaPolicy, SqlClassifier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for sqlwarden.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// LLM provider configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Query validation and execution limits.
    #[serde(default)]
    pub query: QueryConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// LLM provider: "lmstudio", "openai", "ollama" or "mock".
    #[serde(default)]
    pub provider: LlmProvider,

    /// Model name. Each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,

    /// Endpoint override. For LM Studio and OpenAI this is the full chat
    /// completions URL, for Ollama the server base URL.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout for the correction call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// API key (OpenAI only; not recommended to store in config).
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

impl LlmConfig {
    /// Applies environment variable overrides. `provider`, when given, is the
    /// command-line choice and wins over both file and environment.
    pub fn apply_env(&mut self, provider: Option<LlmProvider>) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok(), provider)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.apply_env_with(lookup, None)
    }

    /// Like [`apply_env_from`](Self::apply_env_from), with a provider choice
    /// that outranks `SQLWARDEN_LLM_PROVIDER`.
    ///
    /// The provider is settled before anything else so that provider-specific
    /// variables are picked for the final provider.
    pub fn apply_env_with<F>(&mut self, lookup: F, provider: Option<LlmProvider>) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("SQLWARDEN_LLM_PROVIDER") {
            self.provider = provider.parse().map_err(WardenError::config)?;
        }
        if let Some(provider) = provider {
            self.provider = provider;
        }

        let (url_var, model_var) = match self.provider {
            LlmProvider::LmStudio => (Some("LLM_API_URL"), None),
            LlmProvider::OpenAi => (None, Some("OPENAI_MODEL")),
            LlmProvider::Ollama => (Some("OLLAMA_URL"), Some("OLLAMA_MODEL")),
            LlmProvider::Mock => (None, None),
        };

        if let Some(url) = url_var.and_then(&lookup) {
            self.base_url = Some(url);
        }
        if let Some(model) = model_var.and_then(&lookup) {
            self.model = Some(model);
        }
        if self.provider == LlmProvider::OpenAi {
            if let Some(key) = lookup("OPENAI_API_KEY") {
                self.api_key = Some(key);
            }
        }
        Ok(())
    }

    /// Checks that the endpoint override, if any, is an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let Some(base_url) = &self.base_url else {
            return Ok(());
        };

        let url = Url::parse(base_url)
            .map_err(|e| WardenError::config(format!("Invalid LLM base_url '{base_url}': {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(WardenError::config(format!(
                "Invalid scheme '{}' in LLM base_url. Expected 'http' or 'https'",
                url.scheme()
            )));
        }
        Ok(())
    }
}

/// Query validation and execution settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    /// Row bound for results.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Keywords forbidden in addition to the built-in blocklist.
    #[serde(default)]
    pub extra_forbidden_keywords: Vec<String>,

    /// Which PRAGMA statements the classifier admits.
    #[serde(default)]
    pub pragma_policy: PragmaPolicy,
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
            extra_forbidden_keywords: Vec::new(),
            pragma_policy: PragmaPolicy::default(),
        }
    }
}

impl QueryConfig {
    /// Builds the statement classifier described by this config.
    pub fn classifier(&self) -> Result<SqlClassifier> {
        Ok(SqlClassifier::new()
            .with_extra_keywords(&self.extra_forbidden_keywords)?
            .with_pragma_policy(self.pragma_policy))
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlwarden")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WardenError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Loads the file at `path` (or the default path), then applies the
    /// environment and validates the result. `provider` is a command-line
    /// provider choice, applied before the provider-specific variables.
    pub fn load(path: Option<&Path>, provider: Option<LlmProvider>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        let mut config = Self::load_from_file(&path)?;
        config.llm.apply_env(provider)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all sections.
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        if self.query.max_rows == 0 {
            return Err(WardenError::config("query.max_rows must be at least 1"));
        }
        self.query.classifier().map(|_| ())
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            WardenError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
