//! What the execution guard hands back for one statement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Rows read by a successful execution, bounded by the guard's row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
    /// Wall time from connect to close.
    pub execution_time: Duration,
    /// `rows.len()`, kept alongside for logging.
    pub row_count: usize,
    /// True when the statement produced more rows than the bound.
    pub was_truncated: bool,
}

impl QueryResult {
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len(),
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn with_execution_time(mut self, duration: Duration) -> Self {
        self.execution_time = duration;
        self
    }

    /// Marks that rows past the bound were left unread.
    pub fn truncated(mut self) -> Self {
        self.was_truncated = true;
        self
    }

    /// Column names in result order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Name and declared type of a result column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, or "NULL" for expressions that have none.
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

pub type Row = Vec<Value>;

/// One cell, tagged by SQLite's runtime storage class rather than the
/// declared column type. Serializes as the bare JSON value; blobs become
/// arrays of bytes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "x'{}'", hex_upper(b)),
        }
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Engine error classes used to pick a correction hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionErrorKind {
    NoSuchColumn,
    NoSuchTable,
    SyntaxError,
    Other,
}

impl ExecutionErrorKind {
    /// Classifies an engine error message.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        if message.contains("no such column") {
            Self::NoSuchColumn
        } else if message.contains("no such table") {
            Self::NoSuchTable
        } else if message.contains("syntax error") {
            Self::SyntaxError
        } else {
            Self::Other
        }
    }

    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSuchColumn => "no_such_column",
            Self::NoSuchTable => "no_such_table",
            Self::SyntaxError => "syntax_error",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An engine-reported failure, classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub kind: ExecutionErrorKind,
    pub message: String,
}

impl ExecutionFailure {
    /// Builds a failure from the engine's message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ExecutionErrorKind::classify(&message),
            message,
        }
    }
}

/// What the execution guard returns for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Success(QueryResult),
    Failure(ExecutionFailure),
}

impl ExecutionOutcome {
    /// Returns true if the statement executed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
