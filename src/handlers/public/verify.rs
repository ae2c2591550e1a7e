use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::{ShareCounters, ShareTokenStatus};
use crate::verification::VerificationState;

use super::resolution::{build_receipt_view, resolve_and_record, ReceiptView};

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    /// Identity of the verifying party (e.g. a merchant terminal id)
    #[serde(default)]
    pub actor_id: Option<String>,
    /// Explicitly consume the token after this verification
    #[serde(default)]
    pub mark_as_used: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    /// Raw resolved state for programmatic callers
    pub state: VerificationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ShareTokenStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareCounters>,
}

/// POST /verify/{token} - merchant-facing verification.
///
/// Same resolution as the public read, but a VALID outcome transitions the
/// token to `verified` (recording who and when), or all the way to `used`
/// when the caller explicitly asks. Non-VALID outcomes collapse into
/// `valid: false` plus a human-readable reason, never an error status.
pub async fn verify_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: axum::http::HeaderMap,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let conn = state.db.get()?;

    let resolution = resolve_and_record(&conn, &state.events, &token, &headers)?;

    if resolution.state != VerificationState::Valid {
        return Ok(Json(VerifyResponse {
            valid: false,
            state: resolution.state,
            status: resolution.share.as_ref().map(|s| s.status),
            reason: resolution.state.reason(),
            receipt: None,
            share: resolution.share.as_ref().map(ShareCounters::from),
        }));
    }

    // resolve_and_record only returns VALID for an existing share token
    let share = resolution
        .share
        .as_ref()
        .ok_or_else(|| crate::error::AppError::Internal("VALID state without share token".into()))?;

    let updated = queries::mark_share_token_verified(
        &conn,
        &share.id,
        req.actor_id.as_deref(),
        req.mark_as_used,
    )?;

    let receipt = match &resolution.receipt {
        Some(r) => Some(build_receipt_view(&conn, r)?),
        None => None,
    };

    Ok(Json(VerifyResponse {
        valid: true,
        state: VerificationState::Valid,
        status: Some(updated.status),
        reason: None,
        receipt,
        share: Some(ShareCounters::from(&updated)),
    }))
}
