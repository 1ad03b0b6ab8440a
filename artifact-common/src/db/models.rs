//! Artifact record models
//!
//! Each record converts to and from a positional row in its table's column
//! order, which is how batches travel to and from the UI shell.

use crate::db::schema_sync::TableSchema;
use crate::db::table_schemas::{
    validate_batch, ColorsTableSchema, MediaTableSchema, MetadataTableSchema,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

/// Core object metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArtifactMetadata {
    pub id: i64,
    pub title: Option<String>,
    pub culture: Option<String>,
    pub period: Option<String>,
    pub century: Option<String>,
    pub medium: Option<String>,
    pub dimensions: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub classification: Option<String>,
    pub accessionyear: Option<i64>,
    pub accessionmethod: Option<String>,
}

/// Per-object media statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArtifactMedia {
    pub objectid: i64,
    pub imagecount: Option<i64>,
    pub mediacount: Option<i64>,
    pub colorcount: Option<i64>,
    pub rank: Option<i64>,
    pub datebegin: Option<i64>,
    pub dateend: Option<i64>,
}

/// One color measurement of an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArtifactColor {
    pub objectid: i64,
    pub color: Option<String>,
    pub spectrum: Option<String>,
    pub hue: Option<String>,
    pub percent: Option<f64>,
    pub css3: Option<String>,
}

/// A record stored in one of the artifact tables
pub trait ArtifactRecord: Sized + Send + Unpin + for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> {
    type Schema: TableSchema;

    /// Value of the table's key column
    fn key(&self) -> i64;

    /// Cells in column order
    fn to_row(&self) -> Vec<Value>;

    /// Build from a row that already passed [`validate_batch`]
    fn from_cells(row: &[Value]) -> Result<Self>;

    /// Bind every column, in column order, onto an INSERT statement
    fn bind_columns<'q>(&'q self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Query<'q, Sqlite, SqliteArguments<'q>>;
}

impl ArtifactRecord for ArtifactMetadata {
    type Schema = MetadataTableSchema;

    fn key(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.title),
            json!(self.culture),
            json!(self.period),
            json!(self.century),
            json!(self.medium),
            json!(self.dimensions),
            json!(self.description),
            json!(self.department),
            json!(self.classification),
            json!(self.accessionyear),
            json!(self.accessionmethod),
        ]
    }

    fn from_cells(row: &[Value]) -> Result<Self> {
        let table = Self::Schema::table_name();
        Ok(Self {
            id: int_cell(table, row, 0)?.ok_or_else(|| Error::validation(table, "null id"))?,
            title: text_cell(row, 1),
            culture: text_cell(row, 2),
            period: text_cell(row, 3),
            century: text_cell(row, 4),
            medium: text_cell(row, 5),
            dimensions: text_cell(row, 6),
            description: text_cell(row, 7),
            department: text_cell(row, 8),
            classification: text_cell(row, 9),
            accessionyear: int_cell(table, row, 10)?,
            accessionmethod: text_cell(row, 11),
        })
    }

    fn bind_columns<'q>(&'q self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(self.id)
            .bind(&self.title)
            .bind(&self.culture)
            .bind(&self.period)
            .bind(&self.century)
            .bind(&self.medium)
            .bind(&self.dimensions)
            .bind(&self.description)
            .bind(&self.department)
            .bind(&self.classification)
            .bind(self.accessionyear)
            .bind(&self.accessionmethod)
    }
}

impl ArtifactRecord for ArtifactMedia {
    type Schema = MediaTableSchema;

    fn key(&self) -> i64 {
        self.objectid
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.objectid),
            json!(self.imagecount),
            json!(self.mediacount),
            json!(self.colorcount),
            json!(self.rank),
            json!(self.datebegin),
            json!(self.dateend),
        ]
    }

    fn from_cells(row: &[Value]) -> Result<Self> {
        let table = Self::Schema::table_name();
        Ok(Self {
            objectid: int_cell(table, row, 0)?
                .ok_or_else(|| Error::validation(table, "null objectid"))?,
            imagecount: int_cell(table, row, 1)?,
            mediacount: int_cell(table, row, 2)?,
            colorcount: int_cell(table, row, 3)?,
            rank: int_cell(table, row, 4)?,
            datebegin: int_cell(table, row, 5)?,
            dateend: int_cell(table, row, 6)?,
        })
    }

    fn bind_columns<'q>(&'q self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(self.objectid)
            .bind(self.imagecount)
            .bind(self.mediacount)
            .bind(self.colorcount)
            .bind(self.rank)
            .bind(self.datebegin)
            .bind(self.dateend)
    }
}

impl ArtifactRecord for ArtifactColor {
    type Schema = ColorsTableSchema;

    fn key(&self) -> i64 {
        self.objectid
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            json!(self.objectid),
            json!(self.color),
            json!(self.spectrum),
            json!(self.hue),
            json!(self.percent),
            json!(self.css3),
        ]
    }

    fn from_cells(row: &[Value]) -> Result<Self> {
        let table = Self::Schema::table_name();
        Ok(Self {
            objectid: int_cell(table, row, 0)?
                .ok_or_else(|| Error::validation(table, "null objectid"))?,
            color: text_cell(row, 1),
            spectrum: text_cell(row, 2),
            hue: text_cell(row, 3),
            percent: row.get(4).and_then(Value::as_f64),
            css3: text_cell(row, 5),
        })
    }

    fn bind_columns<'q>(&'q self, query: Query<'q, Sqlite, SqliteArguments<'q>>) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(self.objectid)
            .bind(&self.color)
            .bind(&self.spectrum)
            .bind(&self.hue)
            .bind(self.percent)
            .bind(&self.css3)
    }
}

fn text_cell(row: &[Value], index: usize) -> Option<String> {
    row.get(index).and_then(Value::as_str).map(str::to_string)
}

fn int_cell(table: &str, row: &[Value], index: usize) -> Result<Option<i64>> {
    match row.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::validation(table, format!("column {} is not an integer: {}", index, value))),
    }
}

/// Tabular form of one table's rows: a column header plus positional rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableBatch {
    /// Batch in the table's column order
    pub fn from_records<R: ArtifactRecord>(records: &[R]) -> Self {
        Self {
            columns: R::Schema::column_names(),
            rows: records.iter().map(R::to_row).collect(),
        }
    }

    /// Empty batch with the table's header
    pub fn empty<T: TableSchema>() -> Self {
        Self {
            columns: T::column_names(),
            rows: Vec::new(),
        }
    }

    /// Validate against the table definition, then convert
    pub fn into_records<R: ArtifactRecord>(&self) -> Result<Vec<R>> {
        validate_batch::<R::Schema>(self)?;
        self.rows.iter().map(|row| R::from_cells(row)).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
