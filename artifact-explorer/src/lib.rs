//! artifact-explorer library
//!
//! Fetches a classification's artifacts with their media and color fan-out,
//! copies them into the target store, accumulates imported batches for the
//! session, and runs the fixed query catalog. The UI shell talks to it over
//! HTTP/JSON.

use artifact_common::config::{CompiledDefaults, ExplorerConfig};
use axum::Router;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod session;

use db::{FetchService, QueryCatalog, UpsertService};
use session::SessionAccumulator;

/// Tunables the handlers and services need
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub fetch_limit: i64,
    pub min_classification_count: i64,
    pub fetch_cache_capacity: usize,
    pub session_max_batches: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&CompiledDefaults::for_current_platform())
    }
}

impl From<&CompiledDefaults> for ServiceSettings {
    fn from(defaults: &CompiledDefaults) -> Self {
        Self {
            fetch_limit: defaults.fetch_limit,
            min_classification_count: defaults.min_classification_count,
            fetch_cache_capacity: defaults.fetch_cache_capacity,
            session_max_batches: defaults.session_max_batches,
        }
    }
}

impl From<&ExplorerConfig> for ServiceSettings {
    fn from(config: &ExplorerConfig) -> Self {
        Self {
            fetch_limit: config.fetch_limit,
            min_classification_count: config.min_classification_count,
            fetch_cache_capacity: config.fetch_cache_capacity,
            session_max_batches: config.session_max_batches,
        }
    }
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Reads from the source store
    pub fetch: Arc<FetchService>,
    /// Writes to the target store
    pub upsert: Arc<UpsertService>,
    /// Runs against the target store
    pub catalog: Arc<QueryCatalog>,
    pub session: Arc<Mutex<SessionAccumulator>>,
    pub settings: ServiceSettings,
}

impl AppState {
    /// `source` and `target` may be the same pool
    pub fn new(source: SqlitePool, target: SqlitePool, settings: ServiceSettings) -> Self {
        Self {
            fetch: Arc::new(FetchService::new(source, settings.fetch_cache_capacity)),
            upsert: Arc::new(UpsertService::new(target.clone())),
            catalog: Arc::new(QueryCatalog::new(target)),
            session: Arc::new(Mutex::new(SessionAccumulator::new(settings.session_max_batches))),
            settings,
        }
    }

    /// Lock the session accumulator. Never hold the guard across `.await`.
    pub fn session(&self) -> MutexGuard<'_, SessionAccumulator> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    let api = Router::new()
        .route("/api/classifications", get(api::list_classifications))
        .route("/api/artifacts", get(api::fetch_artifacts))
        .route("/api/upsert", post(api::upsert_batches))
        .route("/api/import", post(api::import_classification))
        .route("/api/queries", get(api::list_queries))
        .route("/api/queries/:id", get(api::run_query))
        .route("/api/session", get(api::get_session).delete(api::clear_session))
        .route("/api/session/:kind", get(api::get_session_page))
        .route("/api/cache", delete(api::clear_cache));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
