//! Command-line argument parsing for sqlwarden.

use clap::{Parser, Subcommand};
use sqlwarden::config::Config;
use sqlwarden::llm::LlmProvider;
use std::path::PathBuf;

/// Read-only SQL execution with one-shot self-correction.
#[derive(Parser, Debug)]
#[command(name = "sqlwarden")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// LLM provider for corrections (lmstudio, openai, ollama, mock)
    #[arg(long, value_name = "PROVIDER", global = true)]
    pub llm: Option<LlmProvider>,

    /// Maximum rows returned per query
    #[arg(long, value_name = "N", global = true)]
    pub max_rows: Option<usize>,

    /// Write logs to the state-directory log file instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Validate and run a statement, correcting it once on failure
    Query {
        /// SQLite database file (opened read-only)
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// SQL statement to run
        #[arg(value_name = "SQL")]
        sql: String,

        /// Hash the database before and after the run and fail if it changed
        #[arg(long)]
        verify_integrity: bool,
    },

    /// Check a statement against the safety rules without running it
    Validate {
        /// SQL statement to check
        #[arg(value_name = "SQL")]
        sql: String,
    },

    /// Print the schema context sent with correction requests
    Schema {
        /// SQLite database file (opened read-only)
        #[arg(value_name = "DATABASE")]
        database: PathBuf,
    },

    /// Print the SHA-256 fingerprint of a database file
    Hash {
        /// File to hash
        #[arg(value_name = "DATABASE")]
        database: PathBuf,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Applies flag overrides on top of a loaded config. `--llm` must also be
    /// passed to `Config::load` so its provider variables are read.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = self.llm {
            config.llm.provider = provider;
        }
        if let Some(max_rows) = self.max_rows {
            config.query.max_rows = max_rows;
        }
    }
}
