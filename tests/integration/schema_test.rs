//! Schema introspection integration tests.

use super::fixture::evidence_db;
use pretty_assertions::assert_eq;
use sqlwarden::db::{DatabaseClient, ForeignKey, SqliteClient};

#[tokio::test]
async fn test_introspect_tables_and_views() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let schema = client.introspect_schema().await.unwrap();

    let names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["big_orders", "customers", "orders"]);
}

#[tokio::test]
async fn test_introspect_columns() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let schema = client.introspect_schema().await.unwrap();
    let customers = schema
        .tables
        .iter()
        .find(|t| t.name == "customers")
        .unwrap();

    let columns: Vec<(&str, &str, bool, bool)> = customers
        .columns
        .iter()
        .map(|c| {
            (
                c.name.as_str(),
                c.data_type.as_str(),
                c.is_nullable,
                c.is_primary_key,
            )
        })
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id", "INTEGER", true, true),
            ("name", "TEXT", false, false),
            ("email", "TEXT", true, false),
        ]
    );
}

#[tokio::test]
async fn test_introspect_foreign_keys() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let schema = client.introspect_schema().await.unwrap();

    assert_eq!(
        schema.foreign_keys,
        vec![ForeignKey {
            from_table: "orders".to_string(),
            from_column: "customer_id".to_string(),
            to_table: "customers".to_string(),
            to_column: "id".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_schema_context_text() {
    let evidence = evidence_db().await;
    let client = SqliteClient::open(&evidence.path).unwrap();

    let context = client.introspect_schema().await.unwrap().format_for_llm();

    assert!(context.starts_with("Database Schema:"));
    assert!(context.contains("Table: customers"));
    assert!(context.contains("  - name: TEXT (NOT NULL)"));
    assert!(context.contains("  - orders.customer_id -> customers.id"));
}
