use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::events::event_types;
use crate::extractors::{Json, Path};
use crate::models::{CreateDispute, Dispute, DisputeItem, DisputeStatus, UpdateDisputeStatus};

#[derive(Debug, Serialize)]
pub struct CreateDisputeResponse {
    pub dispute_id: String,
    pub status: DisputeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount_cents: Option<i64>,
    pub items: Vec<DisputeItem>,
}

/// POST /admin/receipts/{receipt_id}/disputes
pub async fn create_dispute(
    State(state): State<AppState>,
    Path(receipt_id): Path<String>,
    Json(input): Json<CreateDispute>,
) -> Result<Json<CreateDisputeResponse>> {
    let conn = state.db.get()?;

    let (dispute, items) = queries::create_dispute(&conn, &receipt_id, &input)?;

    state.events.record(
        event_types::DISPUTE_SUBMITTED,
        &dispute.id,
        Some(&serde_json::json!({
            "receipt_id": receipt_id,
            "reason_code": dispute.reason_code,
            "total_amount_cents": dispute.total_amount_cents,
            "item_count": items.len(),
        })),
    );

    Ok(Json(CreateDisputeResponse {
        dispute_id: dispute.id,
        status: dispute.status,
        total_amount_cents: dispute.total_amount_cents,
        items,
    }))
}

/// PUT /admin/disputes/{dispute_id}/status
pub async fn update_dispute_status(
    State(state): State<AppState>,
    Path(dispute_id): Path<String>,
    Json(input): Json<UpdateDisputeStatus>,
) -> Result<Json<Dispute>> {
    let conn = state.db.get()?;

    let dispute = queries::update_dispute_status(&conn, &dispute_id, input.status)?
        .ok_or_else(|| AppError::NotFound(format!("Dispute not found: {}", dispute_id)))?;

    state.events.record(
        event_types::DISPUTE_STATUS_CHANGED,
        &dispute.id,
        Some(&serde_json::json!({
            "receipt_id": dispute.receipt_id,
            "status": dispute.status.as_str(),
        })),
    );

    Ok(Json(dispute))
}
