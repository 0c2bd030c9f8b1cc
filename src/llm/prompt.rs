//! Prompt construction for correction requests.
//!
//! Builds the message list sent to the generation service when a statement
//! fails to execute.

use crate::db::{ExecutionErrorKind, ExecutionFailure, Schema};
use crate::llm::types::Message;

/// System prompt for the correction call.
pub const CORRECTION_SYSTEM_PROMPT: &str =
    "You are a SQL correction assistant. Output only the corrected SQL in a ```sql code block.";

/// Closing instruction of the correction prompt.
const READ_ONLY_INSTRUCTION: &str = "The database is read-only. Output ONLY the corrected SELECT query in a ```sql code block. No explanation needed.";

/// Returns the correction hint for an error kind.
pub fn hint_for(kind: ExecutionErrorKind) -> &'static str {
    match kind {
        ExecutionErrorKind::NoSuchColumn => {
            "The column name is wrong or does not exist on that table. Check column names against the schema."
        }
        ExecutionErrorKind::NoSuchTable => {
            "The table name is wrong or does not exist. Check table names against the schema."
        }
        ExecutionErrorKind::SyntaxError => "Fix the SQLite syntax error.",
        ExecutionErrorKind::Other => "Fix the error based on the message below.",
    }
}

/// Everything the generation service is told about a failed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionRequest {
    pub failed_statement: String,
    pub failure: ExecutionFailure,
    /// Schema text, empty when introspection was unavailable.
    pub schema_context: String,
}

impl CorrectionRequest {
    /// Creates a request, formatting the schema when one is available.
    pub fn new(
        failed_statement: impl Into<String>,
        failure: ExecutionFailure,
        schema: Option<&Schema>,
    ) -> Self {
        Self {
            failed_statement: failed_statement.into(),
            failure,
            schema_context: schema.map(Schema::format_for_llm).unwrap_or_default(),
        }
    }

    /// Returns the hint for this failure.
    pub fn hint(&self) -> &'static str {
        hint_for(self.failure.kind)
    }

    /// Renders the user prompt.
    pub fn prompt(&self) -> String {
        // Filled in one pass; inserted text is never rescanned.
        format!(
            "The following SQLite query failed. {hint}\n\n\
             Error type: {kind}\n\
             Error: {message}\n\n\
             Failed query:\n```sql\n{sql}\n```\n\n\
             {schema}\n\n\
             {READ_ONLY_INSTRUCTION}",
            hint = self.hint(),
            kind = self.failure.kind.as_str(),
            message = self.failure.message,
            sql = self.failed_statement,
            schema = self.schema_context.trim_end(),
        )
    }

    /// Builds the complete message list for the correction call.
    pub fn to_messages(&self) -> Vec<Message> {
        vec![
            Message::system(CORRECTION_SYSTEM_PROMPT),
            Message::user(self.prompt()),
        ]
    }
}
