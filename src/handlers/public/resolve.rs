use axum::extract::State;
use serde::Serialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::ShareCounters;
use crate::verification::VerificationState;

use super::resolution::{
    build_dispute_views, build_receipt_view, resolve_and_record, DisputeView, ReceiptView,
};

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub state: VerificationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disputes: Option<Vec<DisputeView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share: Option<ShareCounters>,
}

/// GET /verify/{token} - public, unauthenticated verification.
///
/// Always succeeds at the protocol level; failure is conveyed via `state`.
/// INVALID deliberately does not distinguish "never existed" from "voided",
/// so valid tokens cannot be enumerated by probing.
pub async fn resolve_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Json<ResolveResponse>> {
    let conn = state.db.get()?;

    let resolution = resolve_and_record(&conn, &state.events, &token, &headers)?;

    // Receipt data is only disclosed for states that vouch for the token
    // itself; an expired or invalid token reveals nothing
    let receipt = match resolution.state {
        VerificationState::Valid
        | VerificationState::Refunded
        | VerificationState::Disputed => match &resolution.receipt {
            Some(r) => Some(build_receipt_view(&conn, r)?),
            None => None,
        },
        VerificationState::Expired | VerificationState::Invalid => None,
    };

    let disputes = if resolution.state == VerificationState::Disputed {
        Some(build_dispute_views(&conn, &resolution.active_disputes)?)
    } else {
        None
    };

    Ok(Json(ResolveResponse {
        state: resolution.state,
        receipt,
        disputes,
        share: resolution.share.as_ref().map(ShareCounters::from),
    }))
}
