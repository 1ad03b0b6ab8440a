//! Classification listing and slice fetch

use artifact_common::db::TableBatch;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ClassificationsQuery {
    /// Defaults to the configured minimum
    pub min_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationsResponse {
    pub min_count: i64,
    pub classifications: Vec<String>,
}

/// GET /api/classifications?min_count=N
pub async fn list_classifications(
    State(state): State<AppState>,
    Query(query): Query<ClassificationsQuery>,
) -> ApiResult<Json<ClassificationsResponse>> {
    let min_count = query
        .min_count
        .unwrap_or(state.settings.min_classification_count);
    let classifications = state.fetch.list_classifications(min_count).await?;

    Ok(Json(ClassificationsResponse {
        min_count,
        classifications,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub classification: Option<String>,
    pub limit: Option<i64>,
}

/// The three tables of one fetch, in tabular form
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchResponse {
    pub classification: String,
    pub limit: i64,
    pub metadata: TableBatch,
    pub media: TableBatch,
    pub colors: TableBatch,
}

/// GET /api/artifacts?classification=C&limit=N
pub async fn fetch_artifacts(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> ApiResult<Json<FetchResponse>> {
    let classification = query
        .classification
        .ok_or_else(|| ApiError::BadRequest("classification is required".to_string()))?;
    let limit = query.limit.unwrap_or(state.settings.fetch_limit);

    let fetched = state.fetch.fetch(&classification, limit).await?;

    Ok(Json(FetchResponse {
        classification,
        limit,
        metadata: TableBatch::from_records(&fetched.metadata),
        media: TableBatch::from_records(&fetched.media),
        colors: TableBatch::from_records(&fetched.colors),
    }))
}
