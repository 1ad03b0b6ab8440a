//! Database initialization
//!
//! - Target store: created on first run, tables and indexes ensured, schema synced
//! - Source store: an existing origin database opened read-only

use crate::db::table_schemas::{create_artifact_tables, sync_all_table_schemas};
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Busy timeout applied to every store connection
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Open (creating if needed) the target store and ensure the artifact tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the read paths proceed while an upsert transaction is open
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    let pragma_sql = format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    prepare_schema(&pool).await?;

    Ok(pool)
}

/// Create missing tables, then add missing columns
pub async fn prepare_schema(pool: &SqlitePool) -> Result<()> {
    create_artifact_tables(pool).await?;

    let drift = sync_all_table_schemas(pool).await?;
    if !drift.is_empty() {
        warn!("{} schema difference(s) detected, see above", drift.len());
    }

    Ok(())
}

/// Open an existing origin store without write access
pub async fn connect_source(db_path: &Path) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::Config(format!(
            "Source database not found: {}",
            db_path.display()
        )));
    }

    // Plain read-only: a WAL-mode origin that another process still writes to
    // stays readable, including commits not yet checkpointed
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .read_only(true)
        .busy_timeout(Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)));
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Opened source database (read-only): {}", db_path.display());
    Ok(pool)
}
