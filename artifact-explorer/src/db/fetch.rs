//! Fetch Service
//!
//! Reads one classification's metadata slice and the complete media and color
//! fan-out of that slice, as three result sets. Results are memoized per
//! `(classification, limit)` in a bounded LRU cache that upserts do NOT
//! invalidate: a cached slice stays stale until `clear()` or `invalidate()`.

use artifact_common::db::{
    ArtifactColor, ArtifactMedia, ArtifactMetadata, ArtifactRecord, MetadataTableSchema,
    TableSchema,
};
use artifact_common::{Error, Result};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{placeholders, MAX_IDS_PER_STATEMENT};

/// The three related result sets of one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub metadata: Vec<ArtifactMetadata>,
    pub media: Vec<ArtifactMedia>,
    pub colors: Vec<ArtifactColor>,
}

impl FetchResult {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty() && self.media.is_empty() && self.colors.is_empty()
    }

    /// Distinct metadata ids, ascending
    pub fn ids(&self) -> Vec<i64> {
        self.metadata
            .iter()
            .map(|m| m.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

type CacheKey = (String, i64);

/// Bounded least-recently-used memo of fetch results
#[derive(Debug)]
pub struct FetchCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<FetchResult>>,
    /// Front is least recently used
    order: VecDeque<CacheKey>,
}

impl FetchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, classification: &str, limit: i64) -> Option<Arc<FetchResult>> {
        let key = (classification.to_string(), limit);
        let hit = self.entries.get(&key).cloned()?;
        self.touch(&key);
        Some(hit)
    }

    pub fn insert(&mut self, classification: &str, limit: i64, result: Arc<FetchResult>) {
        let key = (classification.to_string(), limit);
        if self.entries.insert(key.clone(), result).is_some() {
            self.touch(&key);
            return;
        }

        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else { break };
            self.entries.remove(&oldest);
            debug!("Evicted fetch cache entry {:?}", oldest);
        }
    }

    /// Drop every entry for one classification, whatever its limit
    pub fn invalidate(&mut self, classification: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(c, _), _| c != classification);
        self.order.retain(|(c, _)| c != classification);
        before - self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        self.order.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// Reads classification slices from the source store
pub struct FetchService {
    pool: SqlitePool,
    cache: Mutex<FetchCache>,
}

impl FetchService {
    pub fn new(pool: SqlitePool, cache_capacity: usize) -> Self {
        Self {
            pool,
            cache: Mutex::new(FetchCache::new(cache_capacity)),
        }
    }

    /// Memoized fetch of up to `limit` objects of `classification` and their fan-out
    pub async fn fetch(&self, classification: &str, limit: i64) -> Result<Arc<FetchResult>> {
        if limit < 1 {
            return Err(Error::InvalidInput(format!("limit must be at least 1, got {}", limit)));
        }

        if let Some(hit) = self.lock_cache().get(classification, limit) {
            debug!("Fetch cache hit for '{}' (limit {})", classification, limit);
            return Ok(hit);
        }

        let result = Arc::new(self.load(classification, limit).await?);
        self.lock_cache().insert(classification, limit, Arc::clone(&result));
        Ok(result)
    }

    /// Uncached fetch straight from the store
    pub async fn load(&self, classification: &str, limit: i64) -> Result<FetchResult> {
        // Held for all three statements; returned to the pool when dropped
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {} FROM {} WHERE classification = ? COLLATE BINARY LIMIT ?",
            MetadataTableSchema::column_list(),
            MetadataTableSchema::table_name()
        );
        let metadata: Vec<ArtifactMetadata> = sqlx::query_as(&sql)
            .bind(classification)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;

        if metadata.is_empty() {
            info!("No artifacts classified as '{}'", classification);
            return Ok(FetchResult::default());
        }

        let ids: Vec<i64> = metadata
            .iter()
            .map(|m| m.id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let media: Vec<ArtifactMedia> = fetch_by_objectids(&mut conn, &ids).await?;
        let colors: Vec<ArtifactColor> = fetch_by_objectids(&mut conn, &ids).await?;

        info!(
            "Fetched '{}': {} metadata, {} media, {} color rows",
            classification,
            metadata.len(),
            media.len(),
            colors.len()
        );

        Ok(FetchResult { metadata, media, colors })
    }

    /// Classifications with at least `min_count` metadata rows, by name
    pub async fn list_classifications(&self, min_count: i64) -> Result<Vec<String>> {
        let names = sqlx::query_scalar(
            r#"
            SELECT classification
            FROM artifact_metadata
            WHERE classification IS NOT NULL
            GROUP BY classification
            HAVING COUNT(*) >= ?
            ORDER BY classification ASC
            "#,
        )
        .bind(min_count)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    pub fn clear_cache(&self) -> usize {
        let dropped = self.lock_cache().clear();
        info!("Cleared fetch cache ({} entries)", dropped);
        dropped
    }

    pub fn invalidate(&self, classification: &str) -> usize {
        let dropped = self.lock_cache().invalidate(classification);
        info!("Invalidated {} fetch cache entries for '{}'", dropped, classification);
        dropped
    }

    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, FetchCache> {
        // A panic mid-update leaves at worst a missing entry
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Every row of `R`'s table whose key is in `ids`
async fn fetch_by_objectids<R: ArtifactRecord>(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<Vec<R>> {
    let mut records = Vec::new();

    for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            R::Schema::column_list(),
            R::Schema::table_name(),
            R::Schema::key_column(),
            placeholders(chunk.len())
        );

        let mut query = sqlx::query_as::<_, R>(&sql);
        for id in chunk {
            query = query.bind(*id);
        }
        records.extend(query.fetch_all(&mut *conn).await?);
    }

    Ok(records)
}
