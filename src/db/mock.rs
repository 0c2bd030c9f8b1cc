//! Mock database clients for testing.
//!
//! Provides scripted implementations of [`DatabaseClient`] so the correction
//! pipeline can be exercised without a database file.

use super::{ColumnInfo, DatabaseClient, QueryResult, Schema, Value};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A scripted response for statements matching a pattern.
#[derive(Debug, Clone)]
enum Scripted {
    Rows(QueryResult),
    Error(String),
}

/// A mock database client that returns predefined results.
///
/// Statements are matched against patterns in insertion order by
/// case-insensitive substring. Unmatched statements succeed with a
/// single-row result. Every execution is counted and recorded.
#[derive(Debug, Clone, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    scripted: Vec<(String, Scripted)>,
    executions: Arc<AtomicUsize>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Statements containing `pattern` succeed with `result`.
    pub fn with_result(mut self, pattern: impl Into<String>, result: QueryResult) -> Self {
        self.scripted.push((pattern.into(), Scripted::Rows(result)));
        self
    }

    /// Statements containing `pattern` fail with the engine message `message`.
    pub fn with_error(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripted
            .push((pattern.into(), Scripted::Error(message.into())));
        self
    }

    /// Number of statements executed so far.
    pub fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Statements executed so far, in order.
    pub fn executed_statements(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|statements| statements.clone())
            .unwrap_or_default()
    }

    fn lookup(&self, sql: &str) -> Option<&Scripted> {
        let sql_lower = sql.to_lowercase();
        self.scripted
            .iter()
            .find(|(pattern, _)| sql_lower.contains(&pattern.to_lowercase()))
            .map(|(_, scripted)| scripted)
    }

    fn default_result(sql: &str) -> QueryResult {
        QueryResult::with_data(
            vec![ColumnInfo::new("result", "TEXT")],
            vec![vec![Value::String(format!("Mock result for: {}", sql))]],
        )
        .with_execution_time(Duration::from_millis(1))
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_string());
        }

        match self.lookup(sql) {
            Some(Scripted::Rows(result)) => Ok(result.clone()),
            Some(Scripted::Error(message)) => Err(WardenError::query(message.clone())),
            None => Ok(Self::default_result(sql)),
        }
    }
}

/// A database client whose every operation fails.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client that fails with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new("database is unavailable")
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(WardenError::connection(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(WardenError::query(self.message.clone()))
    }
}
