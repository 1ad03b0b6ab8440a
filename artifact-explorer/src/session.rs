//! Session Accumulator
//!
//! In-memory record of every batch imported during this process's lifetime,
//! kept for display. Batches are appended without deduplication, so importing
//! the same classification twice shows its rows twice. The number of batches is
//! bounded; the oldest is evicted first.

use artifact_common::db::{
    ArtifactColor, ArtifactMedia, ArtifactMetadata, ArtifactRecord, TableBatch,
};
use artifact_common::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::FetchResult;
use crate::pagination::{calculate_pagination, Pagination};

/// Rows of one import
#[derive(Debug, Clone)]
pub struct AccumulatedBatch {
    pub import_id: Uuid,
    pub classification: String,
    pub imported_at: DateTime<Utc>,
    pub metadata: Vec<ArtifactMetadata>,
    pub media: Vec<ArtifactMedia>,
    pub colors: Vec<ArtifactColor>,
}

/// Batch listing entry without the rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub import_id: Uuid,
    pub classification: String,
    pub imported_at: DateTime<Utc>,
    pub metadata_rows: usize,
    pub media_rows: usize,
    pub color_rows: usize,
}

/// Every accumulated row, oldest batch first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedRows {
    pub metadata: Vec<ArtifactMetadata>,
    pub media: Vec<ArtifactMedia>,
    pub colors: Vec<ArtifactColor>,
}

/// Record kind selector for paged browsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Metadata,
    Media,
    Colors,
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" => Ok(RecordKind::Metadata),
            "media" => Ok(RecordKind::Media),
            "colors" => Ok(RecordKind::Colors),
            other => Err(Error::NotFound(format!("record kind '{}'", other))),
        }
    }
}

/// One page of accumulated rows of a single kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPage {
    pub total_rows: usize,
    #[serde(flatten)]
    pub pagination: Pagination,
    #[serde(flatten)]
    pub batch: TableBatch,
}

#[derive(Debug)]
pub struct SessionAccumulator {
    max_batches: usize,
    batches: VecDeque<AccumulatedBatch>,
}

impl SessionAccumulator {
    pub fn new(max_batches: usize) -> Self {
        Self {
            max_batches: max_batches.max(1),
            batches: VecDeque::new(),
        }
    }

    /// Append a fetched slice; returns the new batch's id
    pub fn push(&mut self, classification: &str, fetched: &FetchResult) -> Uuid {
        let batch = AccumulatedBatch {
            import_id: Uuid::new_v4(),
            classification: classification.to_string(),
            imported_at: Utc::now(),
            metadata: fetched.metadata.clone(),
            media: fetched.media.clone(),
            colors: fetched.colors.clone(),
        };
        let import_id = batch.import_id;

        self.batches.push_back(batch);
        while self.batches.len() > self.max_batches {
            if let Some(evicted) = self.batches.pop_front() {
                warn!(
                    "Session holds more than {} batches, dropped import {} ('{}')",
                    self.max_batches, evicted.import_id, evicted.classification
                );
            }
        }

        info!("Accumulated import {} for '{}'", import_id, classification);
        import_id
    }

    /// Concatenation of all batches, oldest first
    pub fn accumulated(&self) -> AccumulatedRows {
        let mut rows = AccumulatedRows::default();
        for batch in &self.batches {
            rows.metadata.extend(batch.metadata.iter().cloned());
            rows.media.extend(batch.media.iter().cloned());
            rows.colors.extend(batch.colors.iter().cloned());
        }
        rows
    }

    pub fn summaries(&self) -> Vec<BatchSummary> {
        self.batches
            .iter()
            .map(|b| BatchSummary {
                import_id: b.import_id,
                classification: b.classification.clone(),
                imported_at: b.imported_at,
                metadata_rows: b.metadata.len(),
                media_rows: b.media.len(),
                color_rows: b.colors.len(),
            })
            .collect()
    }

    /// One page of the concatenated rows of `kind`
    pub fn page(&self, kind: RecordKind, requested_page: usize) -> SessionPage {
        match kind {
            RecordKind::Metadata => self.page_of(requested_page, |b| &b.metadata),
            RecordKind::Media => self.page_of(requested_page, |b| &b.media),
            RecordKind::Colors => self.page_of(requested_page, |b| &b.colors),
        }
    }

    fn page_of<R, F>(&self, requested_page: usize, rows_of: F) -> SessionPage
    where
        R: ArtifactRecord + Clone,
        F: Fn(&AccumulatedBatch) -> &Vec<R>,
    {
        let total_rows = self.batches.iter().map(|b| rows_of(b).len()).sum();
        let pagination = calculate_pagination(total_rows, requested_page);
        let range = pagination.range(total_rows);

        let records: Vec<R> = self
            .batches
            .iter()
            .flat_map(|b| rows_of(b).iter())
            .skip(range.start)
            .take(range.len())
            .cloned()
            .collect();

        SessionPage {
            total_rows,
            pagination,
            batch: TableBatch::from_records(&records),
        }
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.batches.len();
        self.batches.clear();
        info!("Cleared session ({} batches)", dropped);
        dropped
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}
