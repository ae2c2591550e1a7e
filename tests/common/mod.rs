//! Test utilities and fixtures for Veritill integration tests

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tower::ServiceExt;

// Re-export the main library crate
pub use veritill::db::{init_audit_db, init_db, queries, AppState};
pub use veritill::events::EventSink;
pub use veritill::handlers;
pub use veritill::models::*;
pub use veritill::verification::VerificationState;

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState with in-memory databases.
///
/// Pool size 1 keeps every request on the same in-memory database.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let audit_manager = SqliteConnectionManager::memory();
    let audit_pool = Pool::builder().max_size(1).build(audit_manager).unwrap();
    {
        let conn = audit_pool.get().unwrap();
        init_audit_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        events: EventSink::new(audit_pool),
        base_url: "http://localhost:3000".to_string(),
        processor_api_url: None,
    }
}

/// Full application router over a test state
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .merge(handlers::public::router())
        .merge(handlers::webhooks::router())
        .merge(handlers::admin::router())
        .with_state(state)
}

/// Create a webhook-sourced test receipt
pub fn create_test_receipt(conn: &Connection, external_payment_id: &str, amount: f64) -> Receipt {
    let (receipt, created) = queries::create_receipt(
        conn,
        external_payment_id,
        amount,
        "usd",
        ReceiptSource::Webhook,
    )
    .expect("Failed to create test receipt");
    assert!(created, "Test receipt already existed: {}", external_payment_id);
    receipt
}

/// Add items to a test receipt: (name, unit_price, quantity)
pub fn create_test_items(
    conn: &Connection,
    receipt_id: &str,
    items: &[(&str, f64, i64)],
) -> Vec<ReceiptItem> {
    let items: Vec<(String, f64, i64)> = items
        .iter()
        .map(|(n, p, q)| (n.to_string(), *p, *q))
        .collect();
    queries::create_receipt_items(conn, receipt_id, &items).expect("Failed to create test items")
}

/// Create a share token for a receipt with default options
pub fn create_test_share_token(conn: &Connection, receipt_id: &str) -> ShareToken {
    let (share, _) = queries::create_or_get_share_token(conn, receipt_id, &Default::default())
        .expect("Failed to create test share token");
    share
}

/// Create a share token with explicit options
pub fn create_test_share_token_with(
    conn: &Connection,
    receipt_id: &str,
    input: &CreateShareToken,
) -> ShareToken {
    let (share, _) = queries::create_or_get_share_token(conn, receipt_id, input)
        .expect("Failed to create test share token");
    share
}

pub fn future_timestamp(days: i64) -> i64 {
    chrono::Utc::now().timestamp() + days * 86400
}

pub fn past_timestamp(days: i64) -> i64 {
    chrono::Utc::now().timestamp() - days * 86400
}

/// Send a GET request through the router
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Send a JSON request through the router
pub async fn send_json(app: &Router, method: &str, uri: &str, body: Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Read a response body as JSON
pub async fn response_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response should be valid JSON")
}
