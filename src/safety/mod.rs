//! Statement safety validation.
//!
//! Untrusted SQL passes through two stages before it may touch a database:
//! the lexical sanitizer masks literals and comments, then the classifier
//! inspects the masked text and returns a [`ValidationVerdict`].

mod classifier;
mod sanitizer;

pub use classifier::{
    validate_sql, PragmaPolicy, SqlClassifier, ALLOWED_STATEMENT_KINDS, ARGUMENT_READ_PRAGMAS,
    FORBIDDEN_KEYWORDS, WRITABLE_PRAGMAS,
};
pub use sanitizer::{sanitize, SanitizedStatement};

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL text exactly as received from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawStatement(String);

impl RawStatement {
    /// Captures the given text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Returns the statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the text with trailing whitespace and semicolons removed,
    /// which is what the engine is handed.
    pub fn executable_text(&self) -> &str {
        self.0.trim_end().trim_end_matches(';').trim()
    }

    /// Consumes the statement, returning the text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RawStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RawStatement {
    fn from(sql: &str) -> Self {
        Self::new(sql)
    }
}

impl From<String> for RawStatement {
    fn from(sql: String) -> Self {
        Self(sql)
    }
}

/// Why a statement was refused. Offsets are byte offsets into the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The first real token is not an allowed statement kind, or the
    /// statement is empty. `found` holds the offending token, if any.
    NotSelectLike { found: Option<String> },
    /// A `;` is followed by more real syntax.
    MultipleStatements { offset: usize },
    /// A blocklisted keyword appears as real syntax.
    ForbiddenKeyword { keyword: String, offset: usize },
    /// A PRAGMA that can change database or connection state.
    UnsafePragma { pragma: String },
}

impl RejectionReason {
    /// Stable snake_case identifier for the reason.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotSelectLike { .. } => "not_select_like",
            Self::MultipleStatements { .. } => "multiple_statements",
            Self::ForbiddenKeyword { .. } => "forbidden_keyword",
            Self::UnsafePragma { .. } => "unsafe_pragma",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSelectLike { found: None } => write!(
                f,
                "Query is empty. It must start with one of: {}",
                ALLOWED_STATEMENT_KINDS.join(", ")
            ),
            Self::NotSelectLike { found: Some(token) } if token == "WITH" => {
                write!(f, "CTE (WITH clause) must contain a SELECT statement")
            }
            Self::NotSelectLike { found: Some(token) } => write!(
                f,
                "Query must start with one of: {} (found '{}')",
                ALLOWED_STATEMENT_KINDS.join(", "),
                token
            ),
            Self::MultipleStatements { offset } => write!(
                f,
                "Multiple SQL statements are not allowed (second statement at offset {})",
                offset
            ),
            Self::ForbiddenKeyword { keyword, offset } => write!(
                f,
                "Query contains forbidden keyword '{}' at offset {}",
                keyword, offset
            ),
            Self::UnsafePragma { pragma } => write!(
                f,
                "PRAGMA {} is not allowed (can modify database or connection state)",
                pragma
            ),
        }
    }
}

/// Outcome of classifying one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    /// The statement may be handed to the execution guard.
    Allowed,
    /// The statement must never be executed.
    Rejected(RejectionReason),
}

impl ValidationVerdict {
    /// Returns true if the statement may be executed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns the rejection reason, if any.
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Allowed => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => write!(f, "Allowed"),
            Self::Rejected(reason) => write!(f, "Rejected: {}", reason),
        }
    }
}
