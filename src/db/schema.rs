//! Schema of an evidence database, as described to the correction prompt.

use std::fmt::{self, Write};

/// Tables, views and foreign keys read from `sqlite_master` and the
/// table-info pragmas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Tables and views, ordered by name.
    pub tables: Vec<Table>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no tables were found.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Renders the schema as the plain-text context block of a correction
    /// prompt.
    pub fn format_for_llm(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Database Schema:\n\n")?;
        for table in &self.tables {
            writeln!(f, "Table: {}", table.name)?;
            for column in &table.columns {
                writeln!(f, "  - {column}")?;
            }
            f.write_char('\n')?;
        }
        if !self.foreign_keys.is_empty() {
            f.write_str("Foreign Keys:\n")?;
            for fk in &self.foreign_keys {
                writeln!(f, "  - {fk}")?;
            }
        }
        Ok(())
    }
}

/// A table or view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub name: String,

    /// Columns in declaration order.
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

/// A column as reported by `pragma_table_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Declared type. SQLite allows none, shown as `ANY`.
    pub data_type: String,
    pub is_nullable: bool,
    pub is_primary_key: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            is_primary_key: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.is_nullable = nullable;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// Renders `name: TYPE (PK, NOT NULL)`.
impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_type = if self.data_type.is_empty() {
            "ANY"
        } else {
            self.data_type.as_str()
        };
        write!(f, "{}: {}", self.name, data_type)?;

        match (self.is_primary_key, self.is_nullable) {
            (true, false) => f.write_str(" (PK, NOT NULL)"),
            (true, true) => f.write_str(" (PK)"),
            (false, false) => f.write_str(" (NOT NULL)"),
            (false, true) => Ok(()),
        }
    }
}

/// One column of a foreign key constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}
