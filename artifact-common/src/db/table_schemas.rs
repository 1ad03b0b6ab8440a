//! Table definitions for the three artifact tables
//!
//! Single source of truth for column names, order and types. The fetch path
//! selects `column_list()`, the upsert path inserts `column_list()`, and tabular
//! batches are validated against `expected_columns()`.

use crate::db::models::TableBatch;
use crate::db::schema_sync::{ColumnDefinition, SchemaDrift, SchemaSync, TableSchema};
use crate::{Error, Result};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

/// `artifact_metadata`: one row per object, keyed by `id`
pub struct MetadataTableSchema;

impl TableSchema for MetadataTableSchema {
    fn table_name() -> &'static str {
        "artifact_metadata"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT"),
            ColumnDefinition::new("culture", "TEXT"),
            ColumnDefinition::new("period", "TEXT"),
            ColumnDefinition::new("century", "TEXT"),
            ColumnDefinition::new("medium", "TEXT"),
            ColumnDefinition::new("dimensions", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("department", "TEXT"),
            ColumnDefinition::new("classification", "TEXT"),
            ColumnDefinition::new("accessionyear", "INTEGER"),
            ColumnDefinition::new("accessionmethod", "TEXT"),
        ]
    }

    fn key_column() -> &'static str {
        "id"
    }

    fn indexed_columns() -> &'static [&'static str] {
        &["classification"]
    }
}

/// `artifact_media`: media statistics, one row per object in practice
pub struct MediaTableSchema;

impl TableSchema for MediaTableSchema {
    fn table_name() -> &'static str {
        "artifact_media"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            // References artifact_metadata.id; deliberately no FOREIGN KEY
            ColumnDefinition::new("objectid", "INTEGER").not_null(),
            ColumnDefinition::new("imagecount", "INTEGER"),
            ColumnDefinition::new("mediacount", "INTEGER"),
            ColumnDefinition::new("colorcount", "INTEGER"),
            ColumnDefinition::new("rank", "INTEGER"),
            ColumnDefinition::new("datebegin", "INTEGER"),
            ColumnDefinition::new("dateend", "INTEGER"),
        ]
    }

    fn key_column() -> &'static str {
        "objectid"
    }

    fn indexed_columns() -> &'static [&'static str] {
        &["objectid"]
    }
}

/// `artifact_colors`: zero or more color measurements per object
pub struct ColorsTableSchema;

impl TableSchema for ColorsTableSchema {
    fn table_name() -> &'static str {
        "artifact_colors"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("objectid", "INTEGER").not_null(),
            ColumnDefinition::new("color", "TEXT"),
            ColumnDefinition::new("spectrum", "TEXT"),
            ColumnDefinition::new("hue", "TEXT"),
            ColumnDefinition::new("percent", "REAL"),
            ColumnDefinition::new("css3", "TEXT"),
        ]
    }

    fn key_column() -> &'static str {
        "objectid"
    }

    fn indexed_columns() -> &'static [&'static str] {
        &["objectid"]
    }
}

/// Check a tabular batch against a table definition.
///
/// Well-formed means: the header equals the declared columns in order, every
/// row has exactly that many cells, the key cell is a non-null integer, and
/// every other cell is null or matches its column type.
pub fn validate_batch<T: TableSchema>(batch: &TableBatch) -> Result<()> {
    let table = T::table_name();
    let columns = T::expected_columns();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    if batch.columns != names {
        return Err(Error::validation(
            table,
            format!("expected columns [{}], got [{}]", names.join(", "), batch.columns.join(", ")),
        ));
    }

    let key_index = T::key_index();
    for (row_index, row) in batch.rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(Error::validation(
                table,
                format!("row {} has {} columns, expected {}", row_index, row.len(), columns.len()),
            ));
        }

        if row[key_index].is_null() {
            return Err(Error::validation(
                table,
                format!("row {} has a null {}", row_index, T::key_column()),
            ));
        }

        for (column, cell) in columns.iter().zip(row) {
            if !cell_matches(&column.sql_type, cell) {
                return Err(Error::validation(
                    table,
                    format!("row {}: {} is not a valid {} value: {}", row_index, column.name, column.sql_type, cell),
                ));
            }
        }
    }

    Ok(())
}

fn cell_matches(sql_type: &str, cell: &Value) -> bool {
    match (sql_type, cell) {
        (_, Value::Null) => true,
        ("INTEGER", Value::Number(n)) => n.is_i64(),
        ("REAL", Value::Number(_)) => true,
        ("TEXT", Value::String(_)) => true,
        _ => false,
    }
}

/// Create the three artifact tables and their indexes if missing
pub async fn create_artifact_tables(pool: &SqlitePool) -> Result<()> {
    SchemaSync::create_table::<MetadataTableSchema>(pool).await?;
    SchemaSync::create_table::<MediaTableSchema>(pool).await?;
    SchemaSync::create_table::<ColorsTableSchema>(pool).await?;
    Ok(())
}

/// Add columns missing from older databases. Returns all detected drift.
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<Vec<SchemaDrift>> {
    info!("Synchronizing artifact table schemas");

    let mut drift = SchemaSync::sync_table::<MetadataTableSchema>(pool).await?;
    drift.extend(SchemaSync::sync_table::<MediaTableSchema>(pool).await?);
    drift.extend(SchemaSync::sync_table::<ColorsTableSchema>(pool).await?);

    Ok(drift)
}
