//! Database abstraction layer for sqlwarden.
//!
//! Provides a trait-based interface over the read-only execution guard so the
//! correction pipeline can run against SQLite or a scripted mock.

mod mock;
mod schema;
mod sqlite;
mod types;

pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use schema::{Column, ForeignKey, Schema, Table};
pub use sqlite::{SqliteClient, DEFAULT_MAX_ROWS};
pub use types::{
    ColumnInfo, ExecutionErrorKind, ExecutionFailure, ExecutionOutcome, QueryResult, Row, Value,
};

use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database clients.
///
/// Implementations never hand out a connection that can write.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and relationship information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns the results.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Executes a statement and classifies any failure.
    ///
    /// Never returns an error: connection and engine failures alike become
    /// [`ExecutionOutcome::Failure`].
    async fn execute(&self, sql: &str) -> ExecutionOutcome {
        match self.execute_query(sql).await {
            Ok(result) => ExecutionOutcome::Success(result),
            Err(e) => ExecutionOutcome::Failure(ExecutionFailure::from_message(e.message())),
        }
    }
}
