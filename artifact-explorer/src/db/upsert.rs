//! Upsert Service
//!
//! Writes fetched rows into the target store, one record kind at a time, in the
//! order metadata, media, colors. For each kind every existing row whose key
//! appears in the batch is deleted and the whole batch inserted, inside one
//! transaction. Kinds commit independently: a failure leaves earlier kinds
//! committed and the failing kind untouched.

use artifact_common::db::{
    ArtifactColor, ArtifactMedia, ArtifactMetadata, ArtifactRecord, MetadataTableSchema,
    TableBatch, TableSchema,
};
use artifact_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

use super::{placeholders, MAX_IDS_PER_STATEMENT};

/// Rows removed and added for one record kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindReport {
    pub deleted: u64,
    pub inserted: u64,
}

/// Outcome of one upsert across the three kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub metadata: KindReport,
    pub media: KindReport,
    pub colors: KindReport,
}

pub struct UpsertService {
    pool: SqlitePool,
}

impl UpsertService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate three tabular batches, then upsert them
    pub async fn upsert_batches(
        &self,
        metadata: &TableBatch,
        media: &TableBatch,
        colors: &TableBatch,
    ) -> Result<UpsertReport> {
        // All three convert before the first statement runs
        let metadata: Vec<ArtifactMetadata> = metadata.into_records()?;
        let media: Vec<ArtifactMedia> = media.into_records()?;
        let colors: Vec<ArtifactColor> = colors.into_records()?;

        self.upsert(&metadata, &media, &colors).await
    }

    /// Delete-then-insert per kind, one transaction per kind
    pub async fn upsert(
        &self,
        metadata: &[ArtifactMetadata],
        media: &[ArtifactMedia],
        colors: &[ArtifactColor],
    ) -> Result<UpsertReport> {
        check_unique_ids(metadata)?;

        let report = UpsertReport {
            metadata: self.replace_kind(metadata).await?,
            media: self.replace_kind(media).await?,
            colors: self.replace_kind(colors).await?,
        };

        info!(
            "Upsert complete: metadata -{}/+{}, media -{}/+{}, colors -{}/+{}",
            report.metadata.deleted,
            report.metadata.inserted,
            report.media.deleted,
            report.media.inserted,
            report.colors.deleted,
            report.colors.inserted
        );

        Ok(report)
    }

    async fn replace_kind<R: ArtifactRecord>(&self, records: &[R]) -> Result<KindReport> {
        let table = R::Schema::table_name();
        if records.is_empty() {
            debug!("No {} rows to upsert", table);
            return Ok(KindReport::default());
        }

        let keys: Vec<i64> = records
            .iter()
            .map(R::key)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            R::Schema::column_list(),
            placeholders(R::Schema::column_names().len())
        );

        // Dropped without commit on any error, which rolls the kind back
        let mut tx = self.pool.begin().await?;
        let mut report = KindReport::default();

        for chunk in keys.chunks(MAX_IDS_PER_STATEMENT) {
            let delete_sql = format!(
                "DELETE FROM {} WHERE {} IN ({})",
                table,
                R::Schema::key_column(),
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&delete_sql);
            for key in chunk {
                query = query.bind(*key);
            }
            report.deleted += query.execute(&mut *tx).await?.rows_affected();
        }

        for record in records {
            report.inserted += record
                .bind_columns(sqlx::query(&insert_sql))
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }

        tx.commit().await?;

        info!(
            "Replaced {} rows for {} keys in {} ({} inserted)",
            report.deleted,
            keys.len(),
            table,
            report.inserted
        );

        Ok(report)
    }
}

/// A metadata batch may name each id only once
fn check_unique_ids(metadata: &[ArtifactMetadata]) -> Result<()> {
    let mut seen = HashSet::with_capacity(metadata.len());
    for (row, record) in metadata.iter().enumerate() {
        if !seen.insert(record.id) {
            return Err(Error::validation(
                MetadataTableSchema::table_name(),
                format!("row {} repeats id {}", row, record.id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_pool;
    use serde_json::json;

    fn metadata(id: i64, title: &str) -> ArtifactMetadata {
        ArtifactMetadata {
            id,
            title: Some(title.to_string()),
            culture: None,
            period: None,
            century: None,
            medium: None,
            dimensions: None,
            description: None,
            department: None,
            classification: Some("Coins".to_string()),
            accessionyear: None,
            accessionmethod: None,
        }
    }

    fn color(objectid: i64, hue: &str) -> ArtifactColor {
        ArtifactColor {
            objectid,
            color: None,
            spectrum: None,
            hue: Some(hue.to_string()),
            percent: Some(0.25),
            css3: None,
        }
    }

    fn media(objectid: i64, rank: i64) -> ArtifactMedia {
        ArtifactMedia {
            objectid,
            imagecount: Some(1),
            mediacount: Some(1),
            colorcount: None,
            rank: Some(rank),
            datebegin: None,
            dateend: None,
        }
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_replaces_existing_rows() {
        let pool = memory_pool().await;
        let service = UpsertService::new(pool.clone());

        service
            .upsert(&[metadata(1, "Old")], &[], &[color(1, "Red"), color(1, "Blue")])
            .await
            .unwrap();
        let report = service
            .upsert(&[metadata(1, "New")], &[], &[color(1, "Green")])
            .await
            .unwrap();

        assert_eq!(report.metadata, KindReport { deleted: 1, inserted: 1 });
        assert_eq!(report.colors, KindReport { deleted: 2, inserted: 1 });

        let title: String = sqlx::query_scalar("SELECT title FROM artifact_metadata WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(title, "New");
        assert_eq!(count(&pool, "artifact_colors").await, 1);
    }

    #[tokio::test]
    async fn test_media_keeps_every_row_per_object() {
        let pool = memory_pool().await;
        let service = UpsertService::new(pool.clone());

        service
            .upsert(&[], &[media(5, 1), media(5, 2), media(5, 3), media(6, 1)], &[])
            .await
            .unwrap();
        let report = service.upsert(&[], &[media(5, 10), media(5, 11)], &[]).await.unwrap();

        assert_eq!(report.media, KindReport { deleted: 3, inserted: 2 });

        let ranks: Vec<i64> =
            sqlx::query_scalar("SELECT rank FROM artifact_media WHERE objectid = 5 ORDER BY rank")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(ranks, vec![10, 11]);
        assert_eq!(count(&pool, "artifact_media").await, 3);
    }

    #[tokio::test]
    async fn test_rows_outside_key_set_survive() {
        let pool = memory_pool().await;
        let service = UpsertService::new(pool.clone());

        service.upsert(&[metadata(1, "A"), metadata(2, "B")], &[], &[]).await.unwrap();
        service.upsert(&[metadata(2, "B2")], &[], &[]).await.unwrap();

        assert_eq!(count(&pool, "artifact_metadata").await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_before_mutation() {
        let pool = memory_pool().await;
        let service = UpsertService::new(pool.clone());

        let result = service
            .upsert(&[metadata(42, "A"), metadata(42, "B")], &[], &[color(42, "Red")])
            .await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(count(&pool, "artifact_metadata").await, 0);
        assert_eq!(count(&pool, "artifact_colors").await, 0);
    }

    #[tokio::test]
    async fn test_malformed_batch_rejected_before_mutation() {
        let pool = memory_pool().await;
        let service = UpsertService::new(pool.clone());

        let good_metadata = TableBatch::from_records(&[metadata(1, "A")]);
        let bad_colors = TableBatch {
            columns: artifact_common::db::ColorsTableSchema::column_names(),
            rows: vec![vec![json!(1), json!("#fff")]],
        };

        let result = service
            .upsert_batches(&good_metadata, &TableBatch::empty::<artifact_common::db::MediaTableSchema>(), &bad_colors)
            .await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(count(&pool, "artifact_metadata").await, 0);
    }

    #[tokio::test]
    async fn test_empty_batches_are_skipped() {
        let service = UpsertService::new(memory_pool().await);
        let report = service.upsert(&[], &[], &[]).await.unwrap();
        assert_eq!(report, UpsertReport::default());
    }
}
