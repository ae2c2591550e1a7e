//! Integration tests for the settings endpoints

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_fresh_store_reports_defaults() {
    let state = create_test_app_state();
    let app = test_app(state);

    let body = response_json(get(&app, "/admin/settings").await).await;
    assert_eq!(body["confidence_threshold"], 85);
    assert_eq!(body["single_use_default"], false);
    assert_eq!(body["verification_enabled"], true);
    assert_eq!(body["retention_days"], 365);
}

#[tokio::test]
async fn test_partial_update_leaves_other_settings_untouched() {
    let state = create_test_app_state();
    let app = test_app(state);

    let body = response_json(
        send_json(&app, "PUT", "/admin/settings", json!({ "confidence_threshold": 70 })).await,
    )
    .await;
    assert_eq!(body["confidence_threshold"], 70);
    assert_eq!(body["single_use_default"], false);
    assert_eq!(body["retention_days"], 365);

    // The update persists across reads
    let body = response_json(get(&app, "/admin/settings").await).await;
    assert_eq!(body["confidence_threshold"], 70);
}

#[tokio::test]
async fn test_threshold_out_of_range_is_rejected() {
    let state = create_test_app_state();
    let app = test_app(state);

    for bad in [-1, 101] {
        let response = send_json(
            &app,
            "PUT",
            "/admin/settings",
            json!({ "confidence_threshold": bad }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "threshold {}", bad);
    }

    // Boundary values are accepted
    for ok in [0, 100] {
        let response = send_json(
            &app,
            "PUT",
            "/admin/settings",
            json!({ "confidence_threshold": ok }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK, "threshold {}", ok);
    }
}

#[tokio::test]
async fn test_retention_must_be_at_least_one_day() {
    let state = create_test_app_state();
    let app = test_app(state);

    let response =
        send_json(&app, "PUT", "/admin/settings", json!({ "retention_days": 0 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body =
        response_json(send_json(&app, "PUT", "/admin/settings", json!({ "retention_days": 30 })).await)
            .await;
    assert_eq!(body["retention_days"], 30);
}

#[tokio::test]
async fn test_threshold_change_affects_item_visibility() {
    let state = create_test_app_state();
    let token = {
        let conn = state.db.get().unwrap();
        let receipt = create_test_receipt(&conn, "pay_501", 20.0);
        create_test_items(&conn, &receipt.id, &[("Book", 20.0, 1)]);
        queries::update_receipt_confidence(&conn, &receipt.id, Some(60), Some(ConfidenceLabel::Medium))
            .unwrap();
        create_test_share_token(&conn, &receipt.id).token
    };
    let app = test_app(state);

    // Score 60 is below the default threshold of 85
    let body = response_json(get(&app, &format!("/verify/{}", token)).await).await;
    assert_eq!(body["receipt"]["below_threshold"], true);

    send_json(&app, "PUT", "/admin/settings", json!({ "confidence_threshold": 50 })).await;

    let body = response_json(get(&app, &format!("/verify/{}", token)).await).await;
    assert_eq!(body["receipt"]["below_threshold"], false);
    assert_eq!(body["receipt"]["items"].as_array().unwrap().len(), 1);
}
