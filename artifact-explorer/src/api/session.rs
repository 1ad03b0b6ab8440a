//! Session browsing and cache control

use artifact_common::db::TableBatch;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::session::{BatchSummary, RecordKind, SessionPage};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub batches: Vec<BatchSummary>,
    pub metadata: TableBatch,
    pub media: TableBatch,
    pub colors: TableBatch,
}

/// GET /api/session
///
/// Every accumulated row, oldest import first.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.session();
    let rows = session.accumulated();

    Json(SessionResponse {
        batches: session.summaries(),
        metadata: TableBatch::from_records(&rows.metadata),
        media: TableBatch::from_records(&rows.media),
        colors: TableBatch::from_records(&rows.colors),
    })
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

/// GET /api/session/:kind?page=N
pub async fn get_session_page(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SessionPage>> {
    let kind: RecordKind = kind.parse()?;
    Ok(Json(state.session().page(kind, query.page)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

/// DELETE /api/session
pub async fn clear_session(State(state): State<AppState>) -> Json<ClearedResponse> {
    let cleared = state.session().clear();
    Json(ClearedResponse { cleared })
}

#[derive(Debug, Deserialize)]
pub struct CacheQuery {
    /// Only this classification's entries; all entries when absent
    pub classification: Option<String>,
}

/// DELETE /api/cache
pub async fn clear_cache(
    State(state): State<AppState>,
    Query(query): Query<CacheQuery>,
) -> Json<ClearedResponse> {
    let cleared = match query.classification {
        Some(classification) => state.fetch.invalidate(&classification),
        None => state.fetch.clear_cache(),
    };
    Json(ClearedResponse { cleared })
}
