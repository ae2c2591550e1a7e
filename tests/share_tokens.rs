//! Integration tests for share token administration

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_create_share_token_returns_verify_url() {
    let state = create_test_app_state();
    let receipt_id = {
        let conn = state.db.get().unwrap();
        create_test_receipt(&conn, "pay_201", 10.0).id
    };
    let app = test_app(state);

    let response = send_json(
        &app,
        "POST",
        &format!("/admin/receipts/{}/share", receipt_id),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert_eq!(
        body["verify_url"],
        format!("http://localhost:3000/verify/{}", token)
    );
    assert_eq!(body["single_use"], false);
    assert_eq!(body["reused"], false);
    assert!(body.get("expires_at").is_none());
}

#[tokio::test]
async fn test_repeat_create_reuses_durable_token() {
    let state = create_test_app_state();
    let receipt_id = {
        let conn = state.db.get().unwrap();
        create_test_receipt(&conn, "pay_202", 10.0).id
    };
    let app = test_app(state);
    let uri = format!("/admin/receipts/{}/share", receipt_id);

    let first = response_json(send_json(&app, "POST", &uri, json!({})).await).await;
    let second = response_json(send_json(&app, "POST", &uri, json!({})).await).await;

    assert_eq!(first["token"], second["token"]);
    assert_eq!(first["reused"], false);
    assert_eq!(second["reused"], true);
}

#[tokio::test]
async fn test_reuse_existing_false_mints_independent_token() {
    let state = create_test_app_state();
    let receipt_id = {
        let conn = state.db.get().unwrap();
        create_test_receipt(&conn, "pay_203", 10.0).id
    };
    let app = test_app(state);
    let uri = format!("/admin/receipts/{}/share", receipt_id);

    let first = response_json(send_json(&app, "POST", &uri, json!({})).await).await;
    let second =
        response_json(send_json(&app, "POST", &uri, json!({ "reuse_existing": false })).await)
            .await;

    assert_ne!(first["token"], second["token"]);
    assert_eq!(second["reused"], false);
}

#[tokio::test]
async fn test_expiring_token_is_not_a_reuse_candidate() {
    let state = create_test_app_state();
    let receipt_id = {
        let conn = state.db.get().unwrap();
        create_test_receipt(&conn, "pay_204", 10.0).id
    };
    let app = test_app(state);
    let uri = format!("/admin/receipts/{}/share", receipt_id);

    let expiring = response_json(
        send_json(&app, "POST", &uri, json!({ "expires_at": future_timestamp(7) })).await,
    )
    .await;
    assert!(expiring["expires_at"].is_i64());

    // A later default create mints a fresh durable token rather than
    // handing out the expiring one
    let durable = response_json(send_json(&app, "POST", &uri, json!({})).await).await;
    assert_ne!(durable["token"], expiring["token"]);
    assert_eq!(durable["reused"], false);

    // ...and that durable token is what subsequent creates reuse
    let again = response_json(send_json(&app, "POST", &uri, json!({})).await).await;
    assert_eq!(again["token"], durable["token"]);
    assert_eq!(again["reused"], true);
}

#[tokio::test]
async fn test_single_use_follows_configured_default() {
    let state = create_test_app_state();
    let receipt_id = {
        let conn = state.db.get().unwrap();
        create_test_receipt(&conn, "pay_205", 10.0).id
    };
    let app = test_app(state);

    send_json(&app, "PUT", "/admin/settings", json!({ "single_use_default": true })).await;

    let body = response_json(
        send_json(
            &app,
            "POST",
            &format!("/admin/receipts/{}/share", receipt_id),
            json!({ "reuse_existing": false }),
        )
        .await,
    )
    .await;
    assert_eq!(body["single_use"], true);

    // Explicit caller value wins over the default
    let body = response_json(
        send_json(
            &app,
            "POST",
            &format!("/admin/receipts/{}/share", receipt_id),
            json!({ "reuse_existing": false, "single_use": false }),
        )
        .await,
    )
    .await;
    assert_eq!(body["single_use"], false);
}

#[tokio::test]
async fn test_create_share_token_for_unknown_receipt() {
    let state = create_test_app_state();
    let app = test_app(state);

    let response = send_json(
        &app,
        "POST",
        "/admin/receipts/vt_rcp_missing/share",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_void_is_idempotent() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        let receipt = create_test_receipt(&conn, "pay_206", 10.0);
        create_test_share_token(&conn, &receipt.id).token
    };
    let app = test_app(state.clone());
    let uri = format!("/admin/tokens/{}/void", token);

    let body = response_json(send_json(&app, "POST", &uri, json!({ "reason": "lost" })).await).await;
    assert_eq!(body["voided"], true);

    let body = response_json(send_json(&app, "POST", &uri, json!({})).await).await;
    assert_eq!(body["voided"], true);

    let conn = state.db.get().unwrap();
    let share = queries::get_share_token_by_token(&conn, &token)
        .unwrap()
        .unwrap();
    assert_eq!(share.status, ShareTokenStatus::Voided);
}

#[tokio::test]
async fn test_void_unknown_token_reports_false() {
    let state = create_test_app_state();
    let app = test_app(state);

    let body = response_json(
        send_json(&app, "POST", "/admin/tokens/never-issued/void", json!({})).await,
    )
    .await;
    assert_eq!(body["voided"], false);
}
