//! Shared resolution orchestration for the public verification endpoints.
//!
//! Both `GET /verify/{token}` and `POST /verify/{token}` fetch the same
//! snapshot, classify it through the pure resolver, and persist the same
//! side effects (lazy expiry, counter increments, single-use consumption).

use axum::http::HeaderMap;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::confidence;
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::events::{event_types, EventSink};
use crate::models::{Dispute, Receipt, ShareToken, ShareTokenStatus};
use crate::verification::{resolve, VerificationState};

/// Outcome of one resolution pass, side effects already persisted.
pub struct Resolution {
    pub state: VerificationState,
    /// The share token with post-increment counters; None when the token
    /// string matched nothing (no side effects in that case)
    pub share: Option<ShareToken>,
    pub receipt: Option<Receipt>,
    pub active_disputes: Vec<Dispute>,
}

/// Resolve a token string and persist the attempt.
///
/// An unknown token is an ordinary INVALID result with no writes: there is
/// no row to count against, and creating one would let anyone enumerate
/// storage.
pub fn resolve_and_record(
    conn: &Connection,
    events: &EventSink,
    token: &str,
    headers: &HeaderMap,
) -> Result<Resolution> {
    if !queries::get_verification_enabled(conn)? {
        return Err(AppError::Unavailable("Verification is temporarily disabled"));
    }

    let Some(share) = queries::get_share_token_by_token(conn, token)? else {
        return Ok(Resolution {
            state: VerificationState::Invalid,
            share: None,
            receipt: None,
            active_disputes: Vec::new(),
        });
    };

    let receipt = queries::get_receipt_by_id(conn, &share.receipt_id)?;
    let active_disputes = match &receipt {
        Some(r) => queries::get_active_disputes(conn, &r.id)?,
        None => Vec::new(),
    };

    let now = Utc::now().timestamp();
    let state = resolve(Some(&share), receipt.as_ref(), &active_disputes, now);

    // One-time lazy transition when first observed past the deadline
    let mark_expired =
        state == VerificationState::Expired && share.status != ShareTokenStatus::Expired;
    // Single-use tokens are consumed on their first successful read
    let consume =
        state == VerificationState::Valid && share.single_use && share.used_at.is_none();

    let updated = queries::record_verification_attempt(conn, &share.id, mark_expired, consume)?;

    let (ip_address, user_agent) = crate::util::extract_request_info(headers);
    events.record_with_request(
        event_types::VERIFICATION_ATTEMPT,
        &share.id,
        Some(&serde_json::json!({
            "state": state.as_str(),
            "receipt_id": share.receipt_id,
        })),
        ip_address.as_deref(),
        user_agent.as_deref(),
    );

    Ok(Resolution {
        state,
        share: Some(updated),
        receipt,
        active_disputes,
    })
}

/// Receipt data as exposed to verification callers.
#[derive(Debug, Serialize)]
pub struct ReceiptView {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub created_at: i64,
    /// True when item detail was suppressed by the confidence gate
    pub below_threshold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ReceiptItemView>>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptItemView {
    pub name: String,
    pub unit_price: f64,
    pub quantity: i64,
}

/// Build the caller-facing receipt view, applying the confidence gate.
///
/// The receipt's existence and aggregate amount are always reported; item
/// detail is dropped when confidence falls below the configured threshold.
pub fn build_receipt_view(conn: &Connection, receipt: &Receipt) -> Result<ReceiptView> {
    let threshold = queries::get_confidence_threshold(conn)?;
    let visible = confidence::is_visible(receipt, threshold);

    let items = if visible {
        let items = queries::list_receipt_items(conn, &receipt.id)?
            .into_iter()
            .map(|i| ReceiptItemView {
                name: i.name,
                unit_price: i.unit_price,
                quantity: i.quantity,
            })
            .collect();
        Some(items)
    } else {
        None
    };

    Ok(ReceiptView {
        id: receipt.id.clone(),
        amount: receipt.amount,
        currency: receipt.currency.clone(),
        created_at: receipt.created_at,
        below_threshold: !visible,
        items,
    })
}

/// Disputed-item detail surfaced when the resolved state is DISPUTED.
#[derive(Debug, Serialize)]
pub struct DisputeView {
    pub id: String,
    pub status: crate::models::DisputeStatus,
    pub reason_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount_cents: Option<i64>,
    pub items: Vec<DisputeItemView>,
}

#[derive(Debug, Serialize)]
pub struct DisputeItemView {
    pub receipt_item_id: String,
    pub quantity: i64,
    pub amount_cents: i64,
}

pub fn build_dispute_views(conn: &Connection, disputes: &[Dispute]) -> Result<Vec<DisputeView>> {
    disputes
        .iter()
        .map(|d| {
            let items = queries::list_dispute_items(conn, &d.id)?
                .into_iter()
                .map(|i| DisputeItemView {
                    receipt_item_id: i.receipt_item_id,
                    quantity: i.quantity,
                    amount_cents: i.amount_cents,
                })
                .collect();
            Ok(DisputeView {
                id: d.id.clone(),
                status: d.status,
                reason_code: d.reason_code.clone(),
                total_amount_cents: d.total_amount_cents,
                items,
            })
        })
        .collect()
}
