use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::events::event_types;
use crate::extractors::{Json, Path};
use crate::models::CreateShareToken;

#[derive(Debug, Serialize)]
pub struct ShareTokenResponse {
    pub token: String,
    pub verify_url: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub single_use: bool,
    /// True when an existing durable token was returned instead of a new one
    pub reused: bool,
}

/// POST /admin/receipts/{receipt_id}/share
pub async fn create_share_token(
    State(state): State<AppState>,
    Path(receipt_id): Path<String>,
    Json(input): Json<CreateShareToken>,
) -> Result<Json<ShareTokenResponse>> {
    let conn = state.db.get()?;

    let (share, created) = queries::create_or_get_share_token(&conn, &receipt_id, &input)?;

    state.events.record(
        if created {
            event_types::SHARE_TOKEN_CREATED
        } else {
            event_types::SHARE_TOKEN_REUSED
        },
        &share.id,
        Some(&serde_json::json!({
            "receipt_id": receipt_id,
            "single_use": share.single_use,
            "expires_at": share.expires_at,
        })),
    );

    Ok(Json(ShareTokenResponse {
        verify_url: format!("{}/verify/{}", state.base_url, share.token),
        token: share.token,
        created_at: share.created_at,
        expires_at: share.expires_at,
        single_use: share.single_use,
        reused: !created,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct VoidTokenRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoidTokenResponse {
    pub voided: bool,
}

/// POST /admin/tokens/{token}/void
///
/// Idempotent: voiding an already-voided token reports success. `voided` is
/// false only when the token string matched nothing.
pub async fn void_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<VoidTokenRequest>,
) -> Result<Json<VoidTokenResponse>> {
    let conn = state.db.get()?;

    let voided = queries::void_share_token(&conn, &token)?;

    if voided {
        if let Some(share) = queries::get_share_token_by_token(&conn, &token)? {
            state.events.record(
                event_types::SHARE_TOKEN_VOIDED,
                &share.id,
                Some(&serde_json::json!({
                    "receipt_id": share.receipt_id,
                    "reason": req.reason,
                })),
            );
        }
    }

    Ok(Json(VoidTokenResponse { voided }))
}
