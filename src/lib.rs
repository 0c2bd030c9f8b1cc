//! sqlwarden - read-only SQL execution with one-shot self-correction.
//!
//! This library exposes the core modules for use by the CLI and in
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod integrity;
pub mod llm;
pub mod logging;
pub mod query;
pub mod safety;
