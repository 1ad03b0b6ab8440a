//! Data synchronization and query layer
//!
//! - [`fetch`]: classification slice plus its media and color fan-out, memoized
//! - [`upsert`]: per-kind delete-then-insert into the target store
//! - [`catalog`]: the twenty fixed analytical queries

pub mod catalog;
pub mod fetch;
pub mod upsert;

pub use catalog::{CatalogEntry, QueryCatalog};
pub use fetch::{FetchCache, FetchResult, FetchService};
pub use upsert::{KindReport, UpsertReport, UpsertService};

/// Largest `IN (...)` list bound in one statement.
///
/// Older SQLite builds cap bound parameters at 999 per statement; id sets are
/// split into chunks of this size.
pub const MAX_IDS_PER_STATEMENT: usize = 500;

/// `?, ?, ?` with `count` placeholders
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
