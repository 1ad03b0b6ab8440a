//! Database initialization tests
//!
//! - Target store is created on first run and reopened without error
//! - Artifact tables and indexes exist after init
//! - Source store opens read-only and refuses writes

use artifact_common::db::{
    connect_source, init_database, ColorsTableSchema, MediaTableSchema, MetadataTableSchema,
    TableSchema,
};
use artifact_common::Error;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("artifacts.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("artifacts.db");

    let first = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO artifact_metadata (id, classification) VALUES (1, 'Coins')")
        .execute(&first)
        .await
        .unwrap();
    first.close().await;

    let second = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifact_metadata")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(count, 1, "Reopening must keep existing rows");
}

#[tokio::test]
async fn test_artifact_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("artifacts.db")).await.unwrap();

    for table in [
        MetadataTableSchema::table_name(),
        MediaTableSchema::table_name(),
        ColorsTableSchema::table_name(),
    ] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "Missing table {}", table);
    }

    let index_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_artifact_%'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(index_count, 3);
}

#[tokio::test]
async fn test_metadata_id_is_primary_key() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("artifacts.db")).await.unwrap();

    sqlx::query("INSERT INTO artifact_metadata (id) VALUES (42)")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate = sqlx::query("INSERT INTO artifact_metadata (id) VALUES (42)")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "Second row with id 42 must be rejected");
}

#[tokio::test]
async fn test_source_missing_is_config_error() {
    let dir = TempDir::new().unwrap();
    let result = connect_source(&dir.path().join("absent.db")).await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_source_is_read_only() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("origin.db");

    // Rollback-journal origin, as produced by an external export
    let url = format!("sqlite://{}?mode=rwc", db_path.display());
    let origin = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("PRAGMA journal_mode = DELETE")
        .execute(&origin)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE artifact_metadata (id INTEGER PRIMARY KEY)")
        .execute(&origin)
        .await
        .unwrap();
    origin.close().await;

    let source = connect_source(&db_path).await.unwrap();
    let write = sqlx::query("INSERT INTO artifact_metadata (id) VALUES (1)")
        .execute(&source)
        .await;
    assert!(write.is_err(), "Write through a read-only source must fail");
}

#[tokio::test]
async fn test_source_reads_live_wal_origin() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("origin.db");

    // WAL-mode origin, left open so its commits stay in the -wal file
    let origin = init_database(&db_path).await.unwrap();
    for id in 1..=5 {
        sqlx::query("INSERT INTO artifact_metadata (id, classification) VALUES (?, 'Coins')")
            .bind(id)
            .execute(&origin)
            .await
            .unwrap();
    }

    let source = connect_source(&db_path).await.unwrap();
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM artifact_metadata WHERE classification = 'Coins'")
            .fetch_one(&source)
            .await
            .unwrap();
    assert_eq!(count, 5);

    // Later commits on the origin are visible to the source pool
    sqlx::query("INSERT INTO artifact_metadata (id, classification) VALUES (6, 'Coins')")
        .execute(&origin)
        .await
        .unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifact_metadata")
        .fetch_one(&source)
        .await
        .unwrap();
    assert_eq!(count, 6);
}
