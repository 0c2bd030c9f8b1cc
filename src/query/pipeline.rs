//! Validation, guarded execution and the single correction retry.
//!
//! Every statement, original or corrected, takes the same path: the
//! classifier first, then the execution guard. A failed execution earns
//! exactly one correction request and nothing more.

use tracing::{error, info, warn};

use crate::db::{DatabaseClient, ExecutionFailure, ExecutionOutcome};
use crate::llm::{extract_sql, CorrectionRequest, LlmClient};
use crate::query::outcome::{CorrectedOutcome, CorrectionAttempt, PipelineOutcome, QueryReport};
use crate::safety::{RawStatement, RejectionReason, SqlClassifier, ValidationVerdict};

/// Result of putting one statement through classifier and guard.
enum Stage {
    Rejected(RejectionReason),
    Executed(ExecutionOutcome),
}

/// Runs submitted statements against one database.
pub struct QueryPipeline<'a> {
    db: &'a dyn DatabaseClient,
    llm: &'a dyn LlmClient,
    classifier: SqlClassifier,
}

impl<'a> QueryPipeline<'a> {
    /// Creates a pipeline with the default classifier.
    pub fn new(db: &'a dyn DatabaseClient, llm: &'a dyn LlmClient) -> Self {
        Self {
            db,
            llm,
            classifier: SqlClassifier::default(),
        }
    }

    /// Replaces the classifier.
    pub fn with_classifier(mut self, classifier: SqlClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Submits a statement and returns the serializable report.
    pub async fn submit(&self, raw: impl Into<RawStatement>) -> QueryReport {
        self.run(raw).await.into()
    }

    /// Submits a statement and returns the typed outcome.
    pub async fn run(&self, raw: impl Into<RawStatement>) -> PipelineOutcome {
        let statement = raw.into();

        let failure = match self.validate_and_execute(&statement).await {
            Stage::Rejected(reason) => {
                return PipelineOutcome::Rejected { statement, reason };
            }
            Stage::Executed(ExecutionOutcome::Success(result)) => {
                return PipelineOutcome::Success { statement, result };
            }
            Stage::Executed(ExecutionOutcome::Failure(failure)) => failure,
        };

        warn!(
            "Query failed ({}): {}. Requesting one correction",
            failure.kind, failure.message
        );

        let attempt = self.correct(statement, failure).await;
        if attempt.succeeded() {
            info!("Corrected query succeeded");
            PipelineOutcome::Corrected(attempt)
        } else {
            if let Some((kind, message)) = attempt.failure() {
                error!("Correction failed ({kind}): {message}");
            }
            PipelineOutcome::CorrectionFailed(attempt)
        }
    }

    async fn validate_and_execute(&self, statement: &RawStatement) -> Stage {
        match self.classifier.validate(statement.as_str()) {
            ValidationVerdict::Rejected(reason) => {
                warn!("Query blocked by validation: {reason}");
                Stage::Rejected(reason)
            }
            ValidationVerdict::Allowed => {
                let sql = statement.executable_text();
                info!("Executing query: {sql}");
                Stage::Executed(self.db.execute(sql).await)
            }
        }
    }

    /// Makes the one correction request. The corrected statement is
    /// classified and executed directly, never corrected again.
    async fn correct(
        &self,
        original_statement: RawStatement,
        original_failure: ExecutionFailure,
    ) -> CorrectionAttempt {
        let schema = match self.db.introspect_schema().await {
            Ok(schema) => Some(schema),
            Err(e) => {
                warn!("Schema context unavailable for correction: {e}");
                None
            }
        };

        let request = CorrectionRequest::new(
            original_statement.as_str(),
            original_failure.clone(),
            schema.as_ref(),
        );

        let (corrected_statement, corrected_outcome) =
            match self.llm.complete(&request.to_messages()).await {
                Err(e) => (None, CorrectedOutcome::GenerationFailed(e.message().to_string())),
                Ok(response) => match extract_sql(&response) {
                    None => (None, CorrectedOutcome::NoStatementExtracted),
                    Some(sql) => {
                        info!("Suggested correction: {sql}");
                        let corrected = RawStatement::new(sql);
                        let outcome = match self.validate_and_execute(&corrected).await {
                            Stage::Rejected(reason) => CorrectedOutcome::Rejected(reason),
                            Stage::Executed(ExecutionOutcome::Success(result)) => {
                                CorrectedOutcome::Success(result)
                            }
                            Stage::Executed(ExecutionOutcome::Failure(failure)) => {
                                CorrectedOutcome::Failed(failure)
                            }
                        };
                        (Some(corrected), outcome)
                    }
                },
            };

        CorrectionAttempt {
            original_statement,
            original_failure,
            corrected_statement,
            corrected_outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        Column, ColumnInfo, ExecutionErrorKind, MockDatabaseClient, QueryResult, Schema, Table,
        Value,
    };
    use crate::llm::MockLlmClient;
    use crate::query::outcome::{ErrorKind, OutcomeTag};
    use crate::safety::PragmaPolicy;
    use pretty_assertions::assert_eq;

    fn customers_schema() -> Schema {
        Schema {
            tables: vec![Table::new("customers")
                .with_column(Column::new("id", "INTEGER").primary_key())
                .with_column(Column::new("name", "TEXT"))],
            foreign_keys: vec![],
        }
    }

    fn names_result() -> QueryResult {
        QueryResult::with_data(
            vec![ColumnInfo::new("name", "TEXT")],
            vec![vec![Value::from("Alice")]],
        )
    }

    fn typo_db() -> MockDatabaseClient {
        MockDatabaseClient::with_schema(customers_schema())
            .with_error("nmae", "no such column: nmae")
            .with_result("SELECT name FROM customers", names_result())
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let db = MockDatabaseClient::new().with_result("SELECT name", names_result());
        let llm = MockLlmClient::new();
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT name FROM customers;").await;

        assert!(report.success);
        assert!(!report.retried);
        assert_eq!(report.columns, Some(vec!["name".to_string()]));
        assert_eq!(report.outcome, OutcomeTag::Success);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(db.executed_statements(), vec!["SELECT name FROM customers"]);
    }

    #[tokio::test]
    async fn test_rejection_never_executes() {
        let db = MockDatabaseClient::new();
        let llm = MockLlmClient::new();
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("DELETE FROM logs").await;

        assert!(!report.success);
        assert!(!report.retried);
        assert_eq!(report.error_kind, Some(ErrorKind::NotSelectLike));
        assert_eq!(report.outcome, OutcomeTag::Rejected);
        assert_eq!(db.execution_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_statements_never_execute() {
        let db = MockDatabaseClient::new();
        let llm = MockLlmClient::new();
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT 1; DROP TABLE x;").await;

        assert_eq!(report.error_kind, Some(ErrorKind::MultipleStatements));
        assert_eq!(db.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_self_correction() {
        let db = typo_db();
        let llm = MockLlmClient::new()
            .with_response("nmae", "Here you go:\n```sql\nSELECT name FROM customers\n```");
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT nmae FROM customers").await;

        assert!(report.success);
        assert!(report.retried);
        assert_eq!(report.original_statement, "SELECT nmae FROM customers");
        assert_eq!(
            report.corrected_statement.as_deref(),
            Some("SELECT name FROM customers")
        );
        assert_eq!(report.rows, Some(vec![vec![Value::from("Alice")]]));
        assert_eq!(report.outcome, OutcomeTag::Corrected);
        assert_eq!(
            report.original_error.map(|e| e.kind),
            Some(ErrorKind::NoSuchColumn)
        );
        assert_eq!(llm.call_count(), 1);
        assert_eq!(db.execution_count(), 2);
    }

    #[tokio::test]
    async fn test_correction_prompt_carries_error_and_schema() {
        let db = typo_db();
        let llm = MockLlmClient::new();
        let pipeline = QueryPipeline::new(&db, &llm);

        pipeline.submit("SELECT nmae FROM customers").await;

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("SELECT nmae FROM customers"));
        assert!(prompts[0].contains("no such column: nmae"));
        assert!(prompts[0].contains("no_such_column"));
        assert!(prompts[0].contains("Table: customers"));
    }

    #[tokio::test]
    async fn test_single_retry_cap() {
        let db = MockDatabaseClient::new().with_error("broken", "no such table: broken");
        let llm = MockLlmClient::new()
            .with_response("broken", "```sql\nSELECT * FROM broken_again\n```");
        let pipeline = QueryPipeline::new(&db, &llm);

        let outcome = pipeline.run("SELECT * FROM broken").await;

        assert!(!outcome.is_success());
        assert!(outcome.retried());
        assert_eq!(outcome.tag(), OutcomeTag::CorrectionFailed);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(db.execution_count(), 2);

        let report = outcome.to_report();
        assert_eq!(report.error_kind, Some(ErrorKind::NoSuchTable));
        assert_eq!(
            report.corrected_statement.as_deref(),
            Some("SELECT * FROM broken_again")
        );
    }

    #[tokio::test]
    async fn test_rejected_correction_is_not_executed() {
        let db = typo_db();
        let llm = MockLlmClient::new().with_response("nmae", "```sql\nDROP TABLE customers\n```");
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT nmae FROM customers").await;

        assert!(!report.success);
        assert!(report.retried);
        assert_eq!(report.error_kind, Some(ErrorKind::NotSelectLike));
        assert_eq!(
            report.corrected_statement.as_deref(),
            Some("DROP TABLE customers")
        );
        assert_eq!(db.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_no_statement_extracted() {
        let db = typo_db();
        let llm = MockLlmClient::new().with_response("nmae", "Sorry, I can't help with that.");
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT nmae FROM customers").await;

        assert!(!report.success);
        assert!(report.retried);
        assert_eq!(report.corrected_statement, None);
        assert_eq!(report.error_kind, Some(ErrorKind::NoStatementExtracted));
        assert_eq!(db.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let db = typo_db();
        let llm = MockLlmClient::new().failing("connection refused");
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT nmae FROM customers").await;

        assert!(!report.success);
        assert!(report.retried);
        assert_eq!(report.error_kind, Some(ErrorKind::GenerationFailed));
        assert!(report.error_message.unwrap().contains("connection refused"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_corrected_statement_has_semicolon_stripped() {
        let db = typo_db();
        let llm =
            MockLlmClient::new().with_response("nmae", "```sql\nSELECT name FROM customers;\n```");
        let pipeline = QueryPipeline::new(&db, &llm);

        let report = pipeline.submit("SELECT nmae FROM customers").await;

        assert!(report.success);
        assert_eq!(
            db.executed_statements(),
            vec!["SELECT nmae FROM customers", "SELECT name FROM customers"]
        );
        assert_eq!(
            report.corrected_statement.as_deref(),
            Some("SELECT name FROM customers;")
        );
    }

    #[tokio::test]
    async fn test_custom_classifier_is_used() {
        let db = MockDatabaseClient::new();
        let llm = MockLlmClient::new();
        let allow_all = SqlClassifier::new().with_pragma_policy(PragmaPolicy::AllowAll);

        let strict = QueryPipeline::new(&db, &llm);
        assert_eq!(
            strict.submit("PRAGMA journal_mode").await.error_kind,
            Some(ErrorKind::UnsafePragma)
        );

        let relaxed = QueryPipeline::new(&db, &llm).with_classifier(allow_all);
        assert!(relaxed.submit("PRAGMA journal_mode").await.success);
    }

    #[tokio::test]
    async fn test_unclassified_failure_still_retries() {
        let db = MockDatabaseClient::new().with_error("t", "database disk image is malformed");
        let llm = MockLlmClient::new();
        let pipeline = QueryPipeline::new(&db, &llm);

        let outcome = pipeline.run("SELECT * FROM t").await;

        match outcome {
            PipelineOutcome::CorrectionFailed(attempt) => {
                assert_eq!(attempt.original_failure.kind, ExecutionErrorKind::Other);
            }
            other => panic!("expected correction failure, got {other:?}"),
        }
        assert_eq!(llm.call_count(), 1);
    }
}
