//! HTTP API handlers for artifact-explorer

pub mod artifacts;
pub mod health;
pub mod import;
pub mod queries;
pub mod session;

pub use artifacts::{fetch_artifacts, list_classifications};
pub use health::health_routes;
pub use import::{import_classification, upsert_batches};
pub use queries::{list_queries, run_query};
pub use session::{clear_cache, clear_session, get_session, get_session_page};
