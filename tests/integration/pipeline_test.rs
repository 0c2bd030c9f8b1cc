//! End-to-end pipeline tests against a real read-only SQLite file.

use super::fixture::evidence_db;
use pretty_assertions::assert_eq;
use sqlwarden::db::{SqliteClient, Value};
use sqlwarden::integrity;
use sqlwarden::llm::MockLlmClient;
use sqlwarden::query::{ErrorKind, OutcomeTag, QueryPipeline};

#[tokio::test]
async fn test_valid_query_succeeds_without_retry() {
    let evidence = evidence_db().await;
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new();
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline
        .submit("SELECT name FROM customers WHERE id = 1;")
        .await;

    assert!(report.success);
    assert!(!report.retried);
    assert_eq!(report.rows, Some(vec![vec![Value::from("Alice")]]));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_forbidden_word_in_literal_is_allowed() {
    let evidence = evidence_db().await;
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new();
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline
        .submit("SELECT name FROM customers WHERE email = 'remember to DROP old backups'")
        .await;

    assert!(report.success);
    assert_eq!(report.rows, Some(vec![vec![Value::from("Eve")]]));
}

#[tokio::test]
async fn test_typo_corrected_once() {
    let evidence = evidence_db().await;
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new().with_response(
        "no such column: nmae",
        "The column is called name.\n\n```sql\nSELECT name FROM customers ORDER BY id LIMIT 2\n```",
    );
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline
        .submit("SELECT nmae FROM customers ORDER BY id LIMIT 2")
        .await;

    assert!(report.success);
    assert!(report.retried);
    assert_eq!(report.outcome, OutcomeTag::Corrected);
    assert_eq!(
        report.corrected_statement.as_deref(),
        Some("SELECT name FROM customers ORDER BY id LIMIT 2")
    );
    assert_eq!(
        report.rows,
        Some(vec![vec![Value::from("Alice")], vec![Value::from("Bob")]])
    );
    assert_eq!(llm.call_count(), 1);

    let prompt = &llm.prompts()[0];
    assert!(prompt.contains("Table: customers"));
    assert!(prompt.contains("  - name: TEXT (NOT NULL)"));
}

#[tokio::test]
async fn test_failed_correction_not_retried_again() {
    let evidence = evidence_db().await;
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new()
        .with_response("custmers", "```sql\nSELECT * FROM clients\n```");
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline.submit("SELECT * FROM custmers").await;

    assert!(!report.success);
    assert!(report.retried);
    assert_eq!(report.outcome, OutcomeTag::CorrectionFailed);
    assert_eq!(report.error_kind, Some(ErrorKind::NoSuchTable));
    assert_eq!(report.error_message.as_deref(), Some("no such table: clients"));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_destructive_correction_blocked() {
    let evidence = evidence_db().await;
    let before = integrity::fingerprint(&evidence.path).unwrap();
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new().with_response("nmae", "```sql\nDELETE FROM customers\n```");
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline.submit("SELECT nmae FROM customers").await;

    assert!(!report.success);
    assert_eq!(report.error_kind, Some(ErrorKind::NotSelectLike));
    integrity::verify_unchanged(&before, &evidence.path).unwrap();
}

#[tokio::test]
async fn test_rejected_statements_leave_file_unchanged() {
    let evidence = evidence_db().await;
    let before = integrity::fingerprint(&evidence.path).unwrap();
    let db = SqliteClient::open(&evidence.path).unwrap();
    let llm = MockLlmClient::new();
    let pipeline = QueryPipeline::new(&db, &llm);

    let cases = [
        ("DROP TABLE customers", ErrorKind::NotSelectLike),
        ("SELECT 1; DELETE FROM customers", ErrorKind::MultipleStatements),
        (
            "WITH x AS (SELECT 1) DELETE FROM customers",
            ErrorKind::ForbiddenKeyword,
        ),
        ("PRAGMA journal_mode = WAL", ErrorKind::UnsafePragma),
        ("ATTACH DATABASE 'other.db' AS other", ErrorKind::NotSelectLike),
    ];

    for (sql, expected) in cases {
        let report = pipeline.submit(sql).await;
        assert!(!report.success, "{sql}");
        assert!(!report.retried, "{sql}");
        assert_eq!(report.error_kind, Some(expected), "{sql}");
    }

    assert_eq!(llm.call_count(), 0);
    integrity::verify_unchanged(&before, &evidence.path).unwrap();
}

#[tokio::test]
async fn test_truncated_flag_reported() {
    let evidence = evidence_db().await;
    let db = SqliteClient::open(&evidence.path).unwrap().with_max_rows(2);
    let llm = MockLlmClient::new();
    let pipeline = QueryPipeline::new(&db, &llm);

    let report = pipeline.submit("SELECT id FROM customers").await;

    assert!(report.success);
    assert!(report.truncated);
    assert_eq!(report.rows.map(|rows| rows.len()), Some(2));
}
