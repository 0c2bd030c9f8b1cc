//! Read-only execution guard tests.
//!
//! Statements here go straight to the guard, skipping the classifier, to
//! show that the connection itself refuses to write.

use super::fixture::evidence_db;
use pretty_assertions::assert_eq;
use sqlwarden::db::{DatabaseClient, ExecutionErrorKind, ExecutionOutcome, SqliteClient, Value};
use sqlwarden::error::WardenError;
use sqlwarden::integrity;

async fn customer_count(client: &SqliteClient) -> Value {
    let result = client
        .execute_query("SELECT COUNT(*) FROM customers")
        .await
        .unwrap();
    result.rows[0][0].clone()
}

#[tokio::test]
async fn test_select_returns_rows() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let result = client
        .execute_query("SELECT id, name FROM customers ORDER BY id LIMIT 2")
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["id", "name"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::Int(1), Value::from("Alice")],
            vec![Value::Int(2), Value::from("Bob")],
        ]
    );
    assert_eq!(result.row_count, 2);
    assert!(!result.was_truncated);
}

#[tokio::test]
async fn test_values_follow_storage_class() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let result = client
        .execute_query("SELECT id, total, receipt FROM orders WHERE id = 1")
        .await
        .unwrap();
    assert_eq!(
        result.rows[0],
        vec![
            Value::Int(1),
            Value::Float(250.5),
            Value::Bytes(vec![0xCA, 0xFE])
        ]
    );

    let result = client
        .execute_query("SELECT email FROM customers WHERE id = 2")
        .await
        .unwrap();
    assert_eq!(result.rows[0], vec![Value::Null]);
}

#[tokio::test]
async fn test_rows_truncated_at_bound() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path)
        .unwrap()
        .with_max_rows(3);

    let result = client
        .execute_query("SELECT name FROM customers ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.row_count, 3);
    assert!(result.was_truncated);

    let exact = client
        .execute_query("SELECT name FROM customers WHERE id <= 3")
        .await
        .unwrap();
    assert_eq!(exact.row_count, 3);
    assert!(!exact.was_truncated);
}

#[tokio::test]
async fn test_writes_denied_by_connection() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    for sql in [
        "DELETE FROM customers",
        "DROP TABLE orders",
        "INSERT INTO customers (id, name) VALUES (9, 'Mallory')",
        "UPDATE customers SET name = 'x'",
        "CREATE TABLE planted (id INTEGER)",
    ] {
        match client.execute(sql).await {
            ExecutionOutcome::Failure(failure) => {
                assert_eq!(failure.kind, ExecutionErrorKind::Other, "{sql}");
                assert!(
                    failure.message.contains("readonly") || failure.message.contains("read-only"),
                    "{sql}: {}",
                    failure.message
                );
            }
            ExecutionOutcome::Success(_) => panic!("write succeeded: {sql}"),
        }
    }

    assert_eq!(customer_count(&client).await, Value::Int(5));
}

#[tokio::test]
async fn test_query_only_enabled() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let result = client.execute_query("PRAGMA query_only").await.unwrap();
    assert_eq!(result.rows, vec![vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_file_unchanged_after_queries() {
    let evidence = evidence_db().await;
    let before = integrity::fingerprint(&evidence.path).unwrap();
    let client = SqliteClient::open(&evidence.path).unwrap();

    client.execute("SELECT * FROM big_orders").await;
    client.execute("DELETE FROM orders").await;
    client.execute("SELECT nmae FROM customers").await;
    client.introspect_schema().await.unwrap();

    assert_eq!(
        integrity::verify_unchanged(&before, &evidence.path).unwrap(),
        before
    );
}

#[tokio::test]
async fn test_errors_are_classified() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let cases = [
        ("SELECT nmae FROM customers", ExecutionErrorKind::NoSuchColumn),
        ("SELECT * FROM custmers", ExecutionErrorKind::NoSuchTable),
        ("SELECT FROM WHERE", ExecutionErrorKind::SyntaxError),
    ];

    for (sql, expected) in cases {
        match client.execute(sql).await {
            ExecutionOutcome::Failure(failure) => assert_eq!(failure.kind, expected, "{sql}"),
            ExecutionOutcome::Success(_) => panic!("expected failure: {sql}"),
        }
    }
}

#[tokio::test]
async fn test_column_error_carries_engine_message() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    match client.execute("SELECT nmae FROM customers").await {
        ExecutionOutcome::Failure(failure) => assert_eq!(failure.message, "no such column: nmae"),
        ExecutionOutcome::Success(_) => panic!("expected failure"),
    }
}

#[tokio::test]
async fn test_open_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.db");

    let err = SqliteClient::open(&path).unwrap_err();
    assert!(matches!(err, WardenError::Connection(_)));
    assert!(!path.exists());
}
