//! Declarative table definitions and automatic schema synchronization
//!
//! A [`TableSchema`] is the single description of a table. It produces the
//! `CREATE TABLE` statement, the column list used by reads and writes, and the
//! expected shape that [`SchemaSync`] compares against `PRAGMA table_info`.
//!
//! Startup runs in two phases:
//! 1. `CREATE TABLE IF NOT EXISTS` plus indexes ([`SchemaSync::create_table`])
//! 2. Add any column the definition has but the database lacks ([`SchemaSync::sync_table`])
//!
//! Type and constraint drift is reported, never repaired: SQLite cannot alter
//! either without rebuilding the table.

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type: "TEXT", "INTEGER" or "REAL"
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause as it appears inside `CREATE TABLE`
    fn ddl(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            clause.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            clause.push_str(" NOT NULL");
        }
        if self.unique {
            clause.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            clause.push_str(&format!(" DEFAULT {}", default));
        }
        clause
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between a table definition and the live table
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Expected shape of one artifact table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Columns in storage order. Reads and writes use exactly this order.
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Column whose values identify the rows an upsert replaces
    fn key_column() -> &'static str;

    /// Secondary (non-unique) indexed columns
    fn indexed_columns() -> &'static [&'static str] {
        &[]
    }

    /// Column names in storage order
    fn column_names() -> Vec<String> {
        Self::expected_columns().into_iter().map(|c| c.name).collect()
    }

    /// Comma-separated column list for SELECT and INSERT statements
    fn column_list() -> String {
        Self::column_names().join(", ")
    }

    /// Position of the key column
    fn key_index() -> usize {
        Self::expected_columns()
            .iter()
            .position(|c| c.name == Self::key_column())
            .unwrap_or(0)
    }
}

/// Reads the live schema of a table
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Columns of `table_name`, ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let rows = sqlx::query(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?)",
        )
        .bind(table_name)
        .fetch_all(pool)
        .await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();
        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Compares a definition against the live table
pub struct SchemaDiff;

impl SchemaDiff {
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if affinity(&expected_col.sql_type) != affinity(&actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }
}

/// SQLite type affinity of a declared type (section 3.1 of the SQLite docs)
fn affinity(declared: &str) -> &'static str {
    let t = declared.to_uppercase();
    if t.contains("INT") {
        "INTEGER"
    } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
        "TEXT"
    } else if t.is_empty() || t.contains("BLOB") {
        "BLOB"
    } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
        "REAL"
    } else {
        "NUMERIC"
    }
}

/// Creates and synchronizes tables from their definitions
pub struct SchemaSync;

impl SchemaSync {
    /// `CREATE TABLE IF NOT EXISTS` plus one index per indexed column
    pub async fn create_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let columns: Vec<String> = T::expected_columns().iter().map(|c| c.ddl()).collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            table,
            columns.join(",\n    ")
        );
        sqlx::query(&sql).execute(pool).await?;

        for column in T::indexed_columns() {
            let sql = format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})"
            );
            sqlx::query(&sql).execute(pool).await?;
        }

        debug!("Ensured table '{}'", table);
        Ok(())
    }

    /// Add missing columns; log drift that needs a manual rebuild
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<Vec<SchemaDrift>> {
        let table_name = T::table_name();

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!("Table '{}' does not exist, skipping schema sync", table_name);
            return Ok(Vec::new());
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual);

        if drift.is_empty() {
            info!("Schema up to date for '{}'", table_name);
            return Ok(drift);
        }

        for change in &drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, table, column).await?;
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}'",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!("Constraint mismatch in {}.{}: missing '{}'", table, column, constraint);
                }
            }
        }

        Ok(drift)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);

        if column.primary_key || column.unique {
            warn!(
                "Column {}.{} is added without its PRIMARY KEY/UNIQUE constraint",
                table, column.name
            );
        }

        // NOT NULL can only be added together with a default
        match (&column.default_value, column.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Column {}.{} has no DEFAULT, adding it as nullable",
                table, column.name
            ),
            (None, false) => {}
        }

        info!("Adding column {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
