//! Evidence database fixtures.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

const FIXTURE_SQL: &str = r#"
CREATE TABLE customers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT
);

CREATE TABLE orders (
    id INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL REFERENCES customers(id),
    total REAL,
    receipt BLOB
);

CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100;

INSERT INTO customers (id, name, email) VALUES
    (1, 'Alice', 'alice@example.com'),
    (2, 'Bob', NULL),
    (3, 'Carol', 'carol@example.com'),
    (4, 'Dave', 'dave@example.com'),
    (5, 'Eve', 'remember to DROP old backups');

INSERT INTO orders (id, customer_id, total, receipt) VALUES
    (1, 1, 250.5, x'CAFE'),
    (2, 2, 19.99, NULL),
    (3, 1, 120.0, NULL);
"#;

/// A populated database file that lives as long as the fixture.
pub struct Evidence {
    _dir: TempDir,
    pub path: PathBuf,
}

/// Creates the fixture database with a separate writable connection, which
/// is closed before the test touches the file.
pub async fn evidence_db() -> Evidence {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("evidence.db");

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await.unwrap();
    sqlx::raw_sql(FIXTURE_SQL).execute(&mut conn).await.unwrap();
    conn.close().await.unwrap();

    Evidence { _dir: dir, path }
}
