//! Integration tests for the artifact-explorer HTTP API
//!
//! Every test runs against a seeded single-store in-memory database.

use artifact_common::db::{prepare_schema, ColorsTableSchema, MediaTableSchema, TableSchema};
use artifact_explorer::{build_router, AppState, ServiceSettings};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: in-memory store with three Coins and one Print
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    prepare_schema(&pool).await.expect("artifact schema");

    for (id, classification) in [(1, "Coins"), (2, "Coins"), (3, "Coins"), (4, "Prints")] {
        sqlx::query("INSERT INTO artifact_metadata (id, title, classification) VALUES (?, ?, ?)")
            .bind(id)
            .bind(format!("Object {}", id))
            .bind(classification)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO artifact_media (objectid, mediacount, rank) VALUES (?, ?, ?)")
            .bind(id)
            .bind(id % 2)
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO artifact_colors (objectid, color, hue) VALUES (?, '#888888', 'Grey')")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool
}

/// Test helper: router over one pool used as both source and target
fn setup_app(db: SqlitePool) -> axum::Router {
    let settings = ServiceSettings {
        min_classification_count: 2,
        ..ServiceSettings::default()
    };
    build_router(AppState::new(db.clone(), db, settings))
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "artifact-explorer");
    assert!(body["version"].is_string());
}

// =============================================================================
// Classifications and fetch
// =============================================================================

#[tokio::test]
async fn test_classifications_use_configured_minimum() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/classifications"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["min_count"], 2);
    assert_eq!(body["classifications"], json!(["Coins"]));

    let response = app
        .oneshot(test_request("GET", "/api/classifications?min_count=1"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["classifications"], json!(["Coins", "Prints"]));
}

#[tokio::test]
async fn test_fetch_returns_three_tables() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(test_request("GET", "/api/artifacts?classification=Coins&limit=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["limit"], 2);
    assert_eq!(body["metadata"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["media"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["colors"]["columns"], json!(ColorsTableSchema::column_names()));
}

#[tokio::test]
async fn test_fetch_rejects_bad_input() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/artifacts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(test_request("GET", "/api/artifacts?classification=Coins&limit=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

// =============================================================================
// Upsert, import and session
// =============================================================================

#[tokio::test]
async fn test_upsert_endpoint_reports_counts() {
    let db = setup_test_db().await;
    let app = setup_app(db.clone());

    let request = json_request(
        "POST",
        "/api/upsert",
        json!({
            "metadata": { "columns": artifact_common::db::MetadataTableSchema::column_names(), "rows": [] },
            "media": {
                "columns": MediaTableSchema::column_names(),
                "rows": [[1, 5, 5, 0, 10, null, null]]
            },
            "colors": { "columns": ColorsTableSchema::column_names(), "rows": [] }
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["media"], json!({ "deleted": 1, "inserted": 1 }));
    assert_eq!(body["metadata"], json!({ "deleted": 0, "inserted": 0 }));

    let imagecount: i64 = sqlx::query_scalar("SELECT imagecount FROM artifact_media WHERE objectid = 1")
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(imagecount, 5);
}

#[tokio::test]
async fn test_upsert_endpoint_rejects_malformed_batch() {
    let app = setup_app(setup_test_db().await);

    let request = json_request(
        "POST",
        "/api/upsert",
        json!({
            "metadata": { "columns": ["id"], "rows": [[1]] },
            "media": { "columns": MediaTableSchema::column_names(), "rows": [] },
            "colors": { "columns": ColorsTableSchema::column_names(), "rows": [] }
        }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_import_accumulates_session() {
    let app = setup_app(setup_test_db().await);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/import", json!({ "classification": "Coins" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["report"]["metadata"]["inserted"], 3);
        assert!(body["import_id"].is_string());
    }

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/session"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["batches"].as_array().unwrap().len(), 2);
    // No dedup across imports
    assert_eq!(body["metadata"]["rows"].as_array().unwrap().len(), 6);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/session/colors?page=1"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_rows"], 6);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["columns"][0], "objectid");

    let response = app
        .clone()
        .oneshot(test_request("DELETE", "/api/session"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["cleared"], 2);

    let response = app
        .oneshot(test_request("GET", "/api/session/tracks"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_clear_endpoint() {
    let app = setup_app(setup_test_db().await);

    for uri in [
        "/api/artifacts?classification=Coins&limit=10",
        "/api/artifacts?classification=Prints&limit=10",
    ] {
        app.clone().oneshot(test_request("GET", uri)).await.unwrap();
    }

    let response = app
        .clone()
        .oneshot(test_request("DELETE", "/api/cache?classification=Prints"))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await["cleared"], 1);

    let response = app
        .oneshot(test_request("DELETE", "/api/cache"))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await["cleared"], 1);
}

// =============================================================================
// Query catalog
// =============================================================================

#[tokio::test]
async fn test_list_queries() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(test_request("GET", "/api/queries")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 20);
    assert_eq!(entries[13]["id"], 14);
    assert!(entries[13]["label"].as_str().unwrap().contains("352919"));
    assert!(entries[0].get("sql").is_none());
}

#[tokio::test]
async fn test_run_query() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/queries/10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["columns"], json!(["no_media"]));
    // Objects 2 and 4 have mediacount 0
    assert_eq!(body["rows"], json!([[2]]));
    assert!(body["error"].is_null());

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/queries/99"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(test_request("GET", "/api/queries/abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_failed_query_is_contained() {
    let db = setup_test_db().await;
    sqlx::query("DROP TABLE artifact_colors").execute(&db).await.unwrap();
    let app = setup_app(db);

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/queries/11"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("11."));
    assert_eq!(body["rows"], json!([]));

    // The service keeps answering
    let response = app
        .oneshot(test_request("GET", "/api/queries/2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
