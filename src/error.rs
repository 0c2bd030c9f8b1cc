//! Error types for sqlwarden.
//!
//! `WardenError` covers the seams where something outside the pipeline can
//! fail: opening the evidence file, the engine, the generation service, the
//! config file and the integrity check. Pipeline outcomes themselves are
//! values; see `query::QueryReport`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WardenError {
    /// The evidence file is missing or cannot be opened read-only.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The engine rejected or failed a statement. The payload is the
    /// engine's own message, which drives error classification.
    #[error("Query error: {0}")]
    Query(String),

    /// The generation service was unreachable, timed out or answered with
    /// an error.
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The evidence file could not be hashed or changed during a run.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Label used when the CLI logs a fatal error.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Integrity(_) => "Integrity Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// The message without its category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Connection(msg)
            | Self::Query(msg)
            | Self::Llm(msg)
            | Self::Config(msg)
            | Self::Integrity(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

pub type Result<T> = std::result::Result<T, WardenError>;
