//! Writes into the target store
//!
//! `POST /api/upsert` takes three tabular batches from the UI shell.
//! `POST /api/import` is the one-click path: fetch a classification, upsert it,
//! and append it to the session.

use artifact_common::db::TableBatch;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::UpsertReport;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub metadata: TableBatch,
    pub media: TableBatch,
    pub colors: TableBatch,
}

/// POST /api/upsert
pub async fn upsert_batches(
    State(state): State<AppState>,
    Json(request): Json<UpsertRequest>,
) -> ApiResult<Json<UpsertReport>> {
    let report = state
        .upsert
        .upsert_batches(&request.metadata, &request.media, &request.colors)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub classification: String,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub import_id: Uuid,
    pub classification: String,
    pub report: UpsertReport,
}

/// POST /api/import
pub async fn import_classification(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportResponse>> {
    let limit = request.limit.unwrap_or(state.settings.fetch_limit);
    let fetched = state.fetch.fetch(&request.classification, limit).await?;

    let report = state
        .upsert
        .upsert(&fetched.metadata, &fetched.media, &fetched.colors)
        .await?;

    let import_id = state.session().push(&request.classification, &fetched);
    info!(
        "Imported '{}' ({} objects) as {}",
        request.classification,
        fetched.metadata.len(),
        import_id
    );

    Ok(Json(ImportResponse {
        import_id,
        classification: request.classification,
        report,
    }))
}
