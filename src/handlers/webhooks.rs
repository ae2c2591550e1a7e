//! Payment processor webhook ingestion.
//!
//! The processor retries on non-2xx responses, so anything that is not a
//! malformed payload is acknowledged with 200 - including refunds for
//! payments this service never saw (nothing useful comes from a retry storm).

use axum::{body::Bytes, extract::State, routing::post, Router};
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::events::event_types;
use crate::extractors::Json;
use crate::ingest;
use crate::payments::{OrderSnapshot, PaymentEvent, PaymentSnapshot, ProcessorClient};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

impl WebhookAck {
    fn ignored() -> Self {
        Self {
            status: "ignored",
            receipt_id: None,
            item_count: None,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/payments", post(handle_payment_webhook))
}

/// POST /webhook/payments
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    // Strict parse at the boundary: malformed payloads are the caller's
    // problem, not something to propagate inward
    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {}", e)))?;

    match event {
        PaymentEvent::Completed { payment, order } => {
            let order = resolve_order(&state, &payment, order).await;

            let conn = state.db.get()?;
            let outcome = ingest::ingest(&conn, &state.events, &payment, order.as_ref())?;

            Ok(Json(WebhookAck {
                status: "ok",
                receipt_id: Some(outcome.receipt_id),
                item_count: Some(outcome.item_count),
            }))
        }
        PaymentEvent::Refunded { payment_id } => {
            let conn = state.db.get()?;
            match queries::mark_receipt_refunded(&conn, &payment_id)? {
                Some(receipt) => {
                    state.events.record(
                        event_types::RECEIPT_REFUNDED,
                        &receipt.id,
                        Some(&serde_json::json!({ "external_payment_id": payment_id })),
                    );
                    Ok(Json(WebhookAck {
                        status: "ok",
                        receipt_id: Some(receipt.id),
                        item_count: None,
                    }))
                }
                None => {
                    tracing::warn!("Refund for unknown payment {}, acknowledging", payment_id);
                    Ok(Json(WebhookAck::ignored()))
                }
            }
        }
        PaymentEvent::Ignored => Ok(Json(WebhookAck::ignored())),
    }
}

/// Resolve the order snapshot for a completed payment.
///
/// Prefers the inline snapshot; otherwise fetches from the processor API
/// when configured. Fetch failure degrades to an item-less receipt.
async fn resolve_order(
    state: &AppState,
    payment: &PaymentSnapshot,
    inline: Option<OrderSnapshot>,
) -> Option<OrderSnapshot> {
    if inline.is_some() {
        return inline;
    }

    let order_id = payment.order_id.as_deref()?;
    let api_url = state.processor_api_url.as_deref()?;

    match ProcessorClient::new(api_url).get_order(order_id).await {
        Ok(order) => Some(order),
        Err(e) => {
            tracing::warn!(
                "Order fetch failed for payment {} (order {}): {}, ingesting without items",
                payment.id,
                order_id,
                e
            );
            None
        }
    }
}
