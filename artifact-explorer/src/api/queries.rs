//! Query Catalog endpoints
//!
//! A catalog query that fails to execute is reported in a successful response
//! with `error` set, so the UI shell shows the message and stays usable.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::db::{CatalogEntry, QueryCatalog};
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use artifact_common::Error;

/// GET /api/queries
pub async fn list_queries() -> Json<&'static [CatalogEntry]> {
    Json(QueryCatalog::list())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRunResponse {
    pub id: u32,
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub error: Option<String>,
}

/// GET /api/queries/:id
pub async fn run_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<QueryRunResponse>> {
    let id: u32 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("catalog query id must be a number, got {:?}", id)))?;
    let entry = QueryCatalog::entry(id)?;

    let response = match state.catalog.run(id).await {
        Ok(batch) => QueryRunResponse {
            id,
            label: entry.label.to_string(),
            columns: batch.columns,
            rows: batch.rows,
            error: None,
        },
        Err(e @ Error::QueryExecution { .. }) => {
            warn!("{}", e);
            QueryRunResponse {
                id,
                label: entry.label.to_string(),
                columns: Vec::new(),
                rows: Vec::new(),
                error: Some(e.to_string()),
            }
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(response))
}
