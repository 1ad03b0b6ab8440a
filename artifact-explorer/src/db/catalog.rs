//! Query Catalog
//!
//! Twenty fixed analytical queries over the artifact tables. Entries are static
//! data; the only value ever bound into a catalog statement is an entry's own
//! `parameter`, so no request input reaches query text.

use artifact_common::db::TableBatch;
use artifact_common::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Executor, Row, SqlitePool, Statement, TypeInfo, ValueRef};
use tracing::{debug, info};

/// One canned query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: u32,
    pub label: &'static str,
    #[serde(skip)]
    pub sql: &'static str,
    /// Bound to the statement's single `?`, if any
    #[serde(skip)]
    pub parameter: Option<i64>,
}

/// Object id used by entry 14
pub const EXAMPLE_OBJECT_ID: i64 = 352919;

static CATALOG: [CatalogEntry; 20] = [
    CatalogEntry {
        id: 1,
        label: "List all artifacts from the 11th century belonging to Byzantine culture",
        sql: "SELECT * FROM artifact_metadata WHERE century = '11th century' AND culture LIKE '%Byzantine%'",
        parameter: None,
    },
    CatalogEntry {
        id: 2,
        label: "Unique cultures represented in the artifacts",
        sql: "SELECT DISTINCT culture FROM artifact_metadata",
        parameter: None,
    },
    CatalogEntry {
        id: 3,
        label: "List all artifacts from the Archaic Period",
        sql: "SELECT * FROM artifact_metadata WHERE period LIKE '%Archaic%'",
        parameter: None,
    },
    CatalogEntry {
        id: 4,
        label: "Artifact titles ordered by accession year in descending order",
        sql: "SELECT title, accessionyear FROM artifact_metadata ORDER BY accessionyear DESC",
        parameter: None,
    },
    CatalogEntry {
        id: 5,
        label: "How many artifacts are there per department",
        sql: "SELECT department, COUNT(*) AS total FROM artifact_metadata GROUP BY department",
        parameter: None,
    },
    CatalogEntry {
        id: 6,
        label: "Which artifacts have less than 3 images?",
        sql: "SELECT objectid, imagecount FROM artifact_media WHERE imagecount < 3",
        parameter: None,
    },
    CatalogEntry {
        id: 7,
        label: "What is the average rank of all artifacts?",
        sql: "SELECT AVG(rank) AS avg_rank FROM artifact_media",
        parameter: None,
    },
    CatalogEntry {
        id: 8,
        label: "Which artifacts have a lower media count than color count?",
        sql: "SELECT objectid, mediacount, colorcount FROM artifact_media WHERE mediacount < colorcount",
        parameter: None,
    },
    CatalogEntry {
        id: 9,
        label: "List all artifacts created between 2001 and 2002",
        sql: "SELECT * FROM artifact_media WHERE datebegin >= 2001 AND dateend <= 2002",
        parameter: None,
    },
    CatalogEntry {
        id: 10,
        label: "How many artifacts have no media files?",
        sql: "SELECT COUNT(*) AS no_media FROM artifact_media WHERE mediacount = 0",
        parameter: None,
    },
    CatalogEntry {
        id: 11,
        label: "What are all the distinct hues used in the dataset?",
        sql: "SELECT DISTINCT hue FROM artifact_colors",
        parameter: None,
    },
    CatalogEntry {
        id: 12,
        label: "Top 5 most used colors by frequency",
        sql: "SELECT color, COUNT(*) AS freq FROM artifact_colors GROUP BY color ORDER BY freq DESC LIMIT 5",
        parameter: None,
    },
    CatalogEntry {
        id: 13,
        label: "Average coverage percentage for each hue",
        sql: "SELECT hue, AVG(percent) AS avg_percent FROM artifact_colors GROUP BY hue",
        parameter: None,
    },
    CatalogEntry {
        id: 14,
        label: "List all colors used for a given artifact ID (example: 352919)",
        sql: "SELECT color, hue FROM artifact_colors WHERE objectid = ?",
        parameter: Some(EXAMPLE_OBJECT_ID),
    },
    CatalogEntry {
        id: 15,
        label: "Total number of color entries",
        sql: "SELECT COUNT(*) AS total_colors FROM artifact_colors",
        parameter: None,
    },
    CatalogEntry {
        id: 16,
        label: "Titles and hues for all Byzantine culture artifacts",
        sql: "SELECT m.title, c.hue FROM artifact_metadata m \
              JOIN artifact_colors c ON m.id = c.objectid \
              WHERE LOWER(m.culture) LIKE '%byzantine%' LIMIT 100",
        parameter: None,
    },
    CatalogEntry {
        id: 17,
        label: "Each artifact title with associated hues",
        sql: "SELECT m.title, c.hue FROM artifact_metadata m \
              LEFT JOIN artifact_colors c ON m.id = c.objectid LIMIT 100",
        parameter: None,
    },
    CatalogEntry {
        id: 18,
        label: "Titles, cultures, and media ranks where period is not null",
        sql: "SELECT m.title, m.culture, med.rank FROM artifact_metadata m \
              JOIN artifact_media med ON m.id = med.objectid \
              WHERE m.period IS NOT NULL LIMIT 100",
        parameter: None,
    },
    CatalogEntry {
        id: 19,
        label: "Titles ranked in top 10 including color hue 'Grey'",
        sql: "SELECT m.title, c.hue, med.rank FROM artifact_metadata m \
              JOIN artifact_colors c ON m.id = c.objectid \
              JOIN artifact_media med ON m.id = med.objectid \
              WHERE LOWER(c.hue) = 'grey' ORDER BY med.rank ASC LIMIT 10",
        parameter: None,
    },
    CatalogEntry {
        id: 20,
        label: "Artifacts per classification with average media count",
        sql: "SELECT m.classification, AVG(med.mediacount) AS avg_media FROM artifact_metadata m \
              JOIN artifact_media med ON m.id = med.objectid \
              GROUP BY m.classification LIMIT 100",
        parameter: None,
    },
];

/// Runs catalog entries against the target store
pub struct QueryCatalog {
    pool: SqlitePool,
}

impl QueryCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All entries, in menu order
    pub fn list() -> &'static [CatalogEntry] {
        &CATALOG
    }

    pub fn entry(id: u32) -> Result<&'static CatalogEntry> {
        CATALOG
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("catalog query {}", id)))
    }

    /// Execute entry `id`. Zero rows is a valid result.
    pub async fn run(&self, id: u32) -> Result<TableBatch> {
        let entry = Self::entry(id)?;
        debug!("Running catalog query {}: {}", entry.id, entry.sql);

        let batch = self.execute(entry).await.map_err(|e| Error::QueryExecution {
            entry: format!("{}. {}", entry.id, entry.label),
            message: e.to_string(),
        })?;

        info!("Catalog query {} returned {} rows", entry.id, batch.len());
        Ok(batch)
    }

    async fn execute(&self, entry: &CatalogEntry) -> std::result::Result<TableBatch, sqlx::Error> {
        let mut query = sqlx::query(entry.sql);
        if let Some(parameter) = entry.parameter {
            query = query.bind(parameter);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let columns = match rows.first() {
            Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
            // No row to read names from; ask the prepared statement instead
            None => self
                .pool
                .prepare(entry.sql)
                .await?
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
        };

        Ok(TableBatch {
            columns,
            rows: rows.iter().map(row_to_json).collect::<std::result::Result<_, _>>()?,
        })
    }
}

/// Dynamic SQLite row to JSON cells. The value's storage class decides the
/// JSON type; BLOBs render as lowercase hex.
fn row_to_json(row: &SqliteRow) -> std::result::Result<Vec<Value>, sqlx::Error> {
    (0..row.len()).map(|i| cell_to_json(row, i)).collect()
}

fn cell_to_json(row: &SqliteRow, index: usize) -> std::result::Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match raw.type_info().name() {
        "INTEGER" => json!(row.try_get::<i64, _>(index)?),
        "REAL" => json!(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::String(hex::encode(row.try_get::<Vec<u8>, _>(index)?)),
        _ => Value::String(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}
