//! Demo tooling: simulated receipts with override flags.
//!
//! Simulated receipts flow through the identical resolver chain as live
//! ones; the override flags let a demo show the REFUNDED/DISPUTED/EXPIRED
//! paths without staging real payment state.

use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::models::{CreateSimulatedReceipt, Receipt, ReceiptItem, UpdateDemoOverrides as Overrides};

#[derive(Debug, Serialize)]
pub struct DemoReceiptResponse {
    pub receipt: Receipt,
    pub items: Vec<ReceiptItem>,
}

/// POST /admin/demo/receipts
pub async fn create_demo_receipt(
    State(state): State<AppState>,
    Json(input): Json<CreateSimulatedReceipt>,
) -> Result<Json<DemoReceiptResponse>> {
    let conn = state.db.get()?;
    let (receipt, items) = queries::create_simulated_receipt(&conn, &input)?;
    Ok(Json(DemoReceiptResponse { receipt, items }))
}

/// PUT /admin/demo/receipts/{receipt_id}/overrides
pub async fn update_demo_overrides(
    State(state): State<AppState>,
    Path(receipt_id): Path<String>,
    Json(input): Json<Overrides>,
) -> Result<Json<Receipt>> {
    let conn = state.db.get()?;
    let receipt = queries::update_demo_overrides(&conn, &receipt_id, &input)?;
    Ok(Json(receipt))
}
