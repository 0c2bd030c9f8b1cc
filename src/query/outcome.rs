//! Pipeline outcomes and the serializable report.
//!
//! [`PipelineOutcome`] has one variant per end state a caller must be able
//! to tell apart. [`QueryReport`] is its flat serialized form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::{ExecutionErrorKind, ExecutionFailure, QueryResult, Row};
use crate::safety::{RawStatement, RejectionReason};

/// Every failure kind a report can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotSelectLike,
    MultipleStatements,
    ForbiddenKeyword,
    UnsafePragma,
    NoSuchColumn,
    NoSuchTable,
    SyntaxError,
    Other,
    /// The generation service call itself errored.
    GenerationFailed,
    /// The service answered without a usable code block.
    NoStatementExtracted,
}

impl ErrorKind {
    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSelectLike => "not_select_like",
            Self::MultipleStatements => "multiple_statements",
            Self::ForbiddenKeyword => "forbidden_keyword",
            Self::UnsafePragma => "unsafe_pragma",
            Self::NoSuchColumn => "no_such_column",
            Self::NoSuchTable => "no_such_table",
            Self::SyntaxError => "syntax_error",
            Self::Other => "other",
            Self::GenerationFailed => "generation_failed",
            Self::NoStatementExtracted => "no_statement_extracted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&RejectionReason> for ErrorKind {
    fn from(reason: &RejectionReason) -> Self {
        match reason {
            RejectionReason::NotSelectLike { .. } => Self::NotSelectLike,
            RejectionReason::MultipleStatements { .. } => Self::MultipleStatements,
            RejectionReason::ForbiddenKeyword { .. } => Self::ForbiddenKeyword,
            RejectionReason::UnsafePragma { .. } => Self::UnsafePragma,
        }
    }
}

impl From<ExecutionErrorKind> for ErrorKind {
    fn from(kind: ExecutionErrorKind) -> Self {
        match kind {
            ExecutionErrorKind::NoSuchColumn => Self::NoSuchColumn,
            ExecutionErrorKind::NoSuchTable => Self::NoSuchTable,
            ExecutionErrorKind::SyntaxError => Self::SyntaxError,
            ExecutionErrorKind::Other => Self::Other,
        }
    }
}

/// What became of the one correction.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectedOutcome {
    /// The corrected statement executed.
    Success(QueryResult),
    /// The classifier refused the corrected statement; it never ran.
    Rejected(RejectionReason),
    /// The corrected statement ran and failed.
    Failed(ExecutionFailure),
    /// The generation service could not be reached or errored.
    GenerationFailed(String),
    /// The response held no extractable statement.
    NoStatementExtracted,
}

/// The original failed statement paired with its single correction.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionAttempt {
    pub original_statement: RawStatement,
    pub original_failure: ExecutionFailure,
    /// `None` when no statement came back from the service.
    pub corrected_statement: Option<RawStatement>,
    pub corrected_outcome: CorrectedOutcome,
}

impl CorrectionAttempt {
    /// Always true: an attempt only exists once a retry was made.
    pub fn retried(&self) -> bool {
        true
    }

    /// Returns true if the corrected statement executed.
    pub fn succeeded(&self) -> bool {
        matches!(self.corrected_outcome, CorrectedOutcome::Success(_))
    }

    /// Kind and message of the correction's failure, if it failed.
    pub fn failure(&self) -> Option<(ErrorKind, String)> {
        match &self.corrected_outcome {
            CorrectedOutcome::Success(_) => None,
            CorrectedOutcome::Rejected(reason) => Some((reason.into(), reason.to_string())),
            CorrectedOutcome::Failed(failure) => {
                Some((failure.kind.into(), failure.message.clone()))
            }
            CorrectedOutcome::GenerationFailed(message) => Some((
                ErrorKind::GenerationFailed,
                format!("Correction request failed: {message}"),
            )),
            CorrectedOutcome::NoStatementExtracted => Some((
                ErrorKind::NoStatementExtracted,
                "Correction response contained no SQL code block".to_string(),
            )),
        }
    }
}

/// Final state of one submitted statement.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Executed on the first attempt.
    Success {
        statement: RawStatement,
        result: QueryResult,
    },
    /// Refused by the classifier; nothing was executed.
    Rejected {
        statement: RawStatement,
        reason: RejectionReason,
    },
    /// Failed, then the correction executed.
    Corrected(CorrectionAttempt),
    /// Failed, and the correction failed or could not be obtained.
    CorrectionFailed(CorrectionAttempt),
}

impl PipelineOutcome {
    /// Returns true if some statement executed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Corrected(_))
    }

    /// Returns true if a correction was requested.
    pub fn retried(&self) -> bool {
        matches!(self, Self::Corrected(_) | Self::CorrectionFailed(_))
    }

    /// Returns the outcome tag.
    pub fn tag(&self) -> OutcomeTag {
        match self {
            Self::Success { .. } => OutcomeTag::Success,
            Self::Rejected { .. } => OutcomeTag::Rejected,
            Self::Corrected(_) => OutcomeTag::Corrected,
            Self::CorrectionFailed(_) => OutcomeTag::CorrectionFailed,
        }
    }

    /// Builds the serializable report.
    pub fn to_report(&self) -> QueryReport {
        match self {
            Self::Success { statement, result } => QueryReport {
                original_statement: statement.to_string(),
                ..QueryReport::with_rows(result, OutcomeTag::Success)
            },
            Self::Rejected { statement, reason } => QueryReport {
                success: false,
                rows: None,
                columns: None,
                retried: false,
                original_statement: statement.to_string(),
                corrected_statement: None,
                error_kind: Some(reason.into()),
                error_message: Some(reason.to_string()),
                truncated: false,
                original_error: None,
                outcome: OutcomeTag::Rejected,
            },
            Self::Corrected(attempt) | Self::CorrectionFailed(attempt) => {
                let mut report = match &attempt.corrected_outcome {
                    CorrectedOutcome::Success(result) => {
                        QueryReport::with_rows(result, OutcomeTag::Corrected)
                    }
                    _ => QueryReport::failed(OutcomeTag::CorrectionFailed),
                };
                if let Some((kind, message)) = attempt.failure() {
                    report.error_kind = Some(kind);
                    report.error_message = Some(message);
                }
                report.retried = attempt.retried();
                report.original_statement = attempt.original_statement.to_string();
                report.corrected_statement =
                    attempt.corrected_statement.as_ref().map(|s| s.to_string());
                report.original_error = Some(ReportedError {
                    kind: attempt.original_failure.kind.into(),
                    message: attempt.original_failure.message.clone(),
                });
                report
            }
        }
    }
}

impl From<PipelineOutcome> for QueryReport {
    fn from(outcome: PipelineOutcome) -> Self {
        outcome.to_report()
    }
}

/// Coarse outcome tag carried in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeTag {
    Success,
    Rejected,
    Corrected,
    CorrectionFailed,
}

/// An error kind with its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Serialized result of one submitted statement. Fields that do not apply
/// are null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub success: bool,
    pub rows: Option<Vec<Row>>,
    pub columns: Option<Vec<String>>,
    pub retried: bool,
    pub original_statement: String,
    pub corrected_statement: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    /// Whether rows beyond the row bound were dropped.
    pub truncated: bool,
    /// The first attempt's failure, when a correction was made.
    pub original_error: Option<ReportedError>,
    pub outcome: OutcomeTag,
}

impl QueryReport {
    fn with_rows(result: &QueryResult, outcome: OutcomeTag) -> Self {
        Self {
            success: true,
            rows: Some(result.rows.clone()),
            columns: Some(result.column_names()),
            truncated: result.was_truncated,
            ..Self::failed(outcome)
        }
    }

    fn failed(outcome: OutcomeTag) -> Self {
        Self {
            success: false,
            rows: None,
            columns: None,
            retried: false,
            original_statement: String::new(),
            corrected_statement: None,
            error_kind: None,
            error_message: None,
            truncated: false,
            original_error: None,
            outcome,
        }
    }
}
