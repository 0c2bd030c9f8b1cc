//! SQLite read-only execution guard.
//!
//! Every execution opens a fresh connection that is read-only twice over:
//! the file is opened with `SQLITE_OPEN_READONLY`, and the session then sets
//! `PRAGMA query_only = ON`. The connection is closed when the statement is
//! done and is never shared.

use crate::db::{
    Column, ColumnInfo, DatabaseClient, ForeignKey, QueryResult, Row, Schema, Table, Value,
};
use crate::error::{Result, WardenError};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{
    Column as SqlxColumn, Connection, Executor, Row as SqlxRow, Statement, TypeInfo, ValueRef,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum rows returned from a query unless configured otherwise.
pub const DEFAULT_MAX_ROWS: usize = 2000;

/// SQLite database client that can only read.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    path: PathBuf,
    max_rows: usize,
}

impl SqliteClient {
    /// Creates a client for an existing database file.
    ///
    /// No connection is held; one is opened per execution.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(WardenError::connection(format!(
                "Database file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            max_rows: DEFAULT_MAX_ROWS,
        })
    }

    /// Sets the row bound. Zero is treated as one.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the row bound.
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Opens a connection with both read-only layers enabled.
    async fn connect(&self) -> Result<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .read_only(true)
            .create_if_missing(false);

        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| {
                WardenError::connection(format!(
                    "Cannot open {} read-only: {}",
                    self.path.display(),
                    format_query_error(&e)
                ))
            })?;

        sqlx::query("PRAGMA query_only = ON")
            .execute(&mut conn)
            .await
            .map_err(|e| {
                WardenError::connection(format!(
                    "Cannot enable query_only: {}",
                    format_query_error(&e)
                ))
            })?;

        debug!("Opened read-only connection to {}", self.path.display());
        Ok(conn)
    }

    /// Fetches at most `max_rows + 1` rows so truncation can be detected
    /// without draining the cursor.
    async fn fetch_bounded(&self, conn: &mut SqliteConnection, sql: &str) -> Result<QueryResult> {
        let statement = (&mut *conn)
            .prepare(sql)
            .await
            .map_err(|e| WardenError::query(format_query_error(&e)))?;

        let columns: Vec<ColumnInfo> = statement
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect();

        let mut rows: Vec<Row> = Vec::new();
        let mut was_truncated = false;
        let mut stream = statement.query().fetch(&mut *conn);

        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| WardenError::query(format_query_error(&e)))?
        {
            if rows.len() == self.max_rows {
                was_truncated = true;
                break;
            }
            rows.push(convert_row(&row));
        }

        let mut result = QueryResult::with_data(columns, rows);
        if was_truncated {
            warn!(
                "Query returned more than {} rows, truncating results",
                self.max_rows
            );
            result = result.truncated();
        }
        Ok(result)
    }

    async fn read_schema(&self, conn: &mut SqliteConnection) -> Result<Schema> {
        let tables = self.fetch_tables(conn).await?;
        let foreign_keys = self.fetch_foreign_keys(conn, &tables).await?;
        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn fetch_tables(&self, conn: &mut SqliteConnection) -> Result<Vec<Table>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type IN ('table', 'view')
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| WardenError::query(format!("Failed to fetch tables: {e}")))?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.fetch_columns(conn, &name).await?;
            tables.push(Table { name, columns });
        }
        Ok(tables)
    }

    async fn fetch_columns(
        &self,
        conn: &mut SqliteConnection,
        table_name: &str,
    ) -> Result<Vec<Column>> {
        let rows = sqlx::query(
            r#"
            SELECT name, type, "notnull", pk
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#,
        )
        .bind(table_name)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            WardenError::query(format!(
                "Failed to fetch columns for table '{table_name}': {e}"
            ))
        })?;

        rows.iter()
            .map(|row| -> Result<Column> {
                let not_null: i64 = row.try_get("notnull").map_err(column_decode_error)?;
                let pk: i64 = row.try_get("pk").map_err(column_decode_error)?;
                Ok(Column {
                    name: row.try_get("name").map_err(column_decode_error)?,
                    data_type: row.try_get("type").map_err(column_decode_error)?,
                    is_nullable: not_null == 0,
                    is_primary_key: pk > 0,
                })
            })
            .collect()
    }

    async fn fetch_foreign_keys(
        &self,
        conn: &mut SqliteConnection,
        tables: &[Table],
    ) -> Result<Vec<ForeignKey>> {
        let mut foreign_keys = Vec::new();

        for table in tables {
            let rows = sqlx::query(
                r#"
                SELECT "table", "from", "to"
                FROM pragma_foreign_key_list(?1)
                ORDER BY id, seq
                "#,
            )
            .bind(&table.name)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| WardenError::query(format!("Failed to fetch foreign keys: {e}")))?;

            for row in &rows {
                let to_table: String = row.try_get("table").map_err(column_decode_error)?;
                let to_column: Option<String> = row.try_get("to").map_err(column_decode_error)?;
                // A missing target column means the parent's primary key.
                let to_column = to_column
                    .or_else(|| primary_key_of(tables, &to_table))
                    .unwrap_or_else(|| "rowid".to_string());

                foreign_keys.push(ForeignKey {
                    from_table: table.name.clone(),
                    from_column: row.try_get("from").map_err(column_decode_error)?,
                    to_table,
                    to_column,
                });
            }
        }

        Ok(foreign_keys)
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let mut conn = self.connect().await?;
        let schema = self.read_schema(&mut conn).await;
        close_connection(conn).await;
        schema
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let mut conn = self.connect().await?;
        let result = self.fetch_bounded(&mut conn, sql).await;
        close_connection(conn).await;

        let result = result?.with_execution_time(start.elapsed());
        debug!(
            "Query returned {} rows in {:?}",
            result.row_count, result.execution_time
        );
        Ok(result)
    }
}

async fn close_connection(conn: SqliteConnection) {
    if let Err(e) = conn.close().await {
        warn!("Failed to close read-only connection: {e}");
    }
}

fn primary_key_of(tables: &[Table], table_name: &str) -> Option<String> {
    tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(table_name))?
        .columns
        .iter()
        .find(|c| c.is_primary_key)
        .map(|c| c.name.clone())
}

fn column_decode_error(e: sqlx::Error) -> WardenError {
    WardenError::query(format!("Unexpected schema row: {e}"))
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Converts one value by its runtime storage class, which in SQLite can
/// differ from the declared column type.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Returns the engine's own message for database errors, so that
/// classification sees e.g. "no such column: nmae" without sqlx framing.
fn format_query_error(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
