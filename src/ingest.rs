//! Receipt ingestion: idempotent materialization of receipts from payment
//! snapshots.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::events::{event_types, EventSink};
use crate::models::ReceiptSource;
use crate::payments::{OrderSnapshot, PaymentSnapshot};
use crate::util::minor_units_to_amount;

/// Result of one ingestion call.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub receipt_id: String,
    pub external_payment_id: String,
    pub item_count: usize,
    /// False when this delivery was a redelivery and the receipt already existed
    pub created: bool,
}

/// Materialize a receipt (+ items) from a payment snapshot.
///
/// Redelivery of the same payment is success: the pre-existing receipt is
/// returned untouched. Item insertion is best-effort - a receipt with zero
/// items is an acceptable degraded outcome, never a rollback.
pub fn ingest(
    conn: &Connection,
    events: &EventSink,
    payment: &PaymentSnapshot,
    order: Option<&OrderSnapshot>,
) -> Result<IngestOutcome> {
    let amount = minor_units_to_amount(payment.amount_minor_units);
    let currency = payment.currency.to_lowercase();

    let (receipt, created) = queries::create_receipt(
        conn,
        &payment.id,
        amount,
        &currency,
        ReceiptSource::Webhook,
    )?;

    if !created {
        tracing::info!(
            "Payment {} redelivered, returning existing receipt {}",
            payment.id,
            receipt.id
        );
        let item_count = queries::list_receipt_items(conn, &receipt.id)?.len();
        return Ok(IngestOutcome {
            receipt_id: receipt.id,
            external_payment_id: receipt.external_payment_id,
            item_count,
            created: false,
        });
    }

    let mut item_count = 0;
    if let Some(order) = order {
        let items: Vec<(String, f64, i64)> = order
            .line_items
            .iter()
            .map(|li| {
                (
                    li.name.clone(),
                    minor_units_to_amount(li.unit_price_minor_units),
                    li.parsed_quantity(),
                )
            })
            .collect();

        match queries::create_receipt_items(conn, &receipt.id, &items) {
            Ok(created_items) => item_count = created_items.len(),
            // Zero-item receipt is the degraded outcome, not a failure
            Err(e) => {
                tracing::warn!("Failed to insert items for receipt {}: {}", receipt.id, e);
            }
        }
    }

    events.record(
        event_types::RECEIPT_INGESTED,
        &receipt.id,
        Some(&serde_json::json!({
            "external_payment_id": payment.id,
            "amount": amount,
            "currency": currency,
            "item_count": item_count,
        })),
    );

    Ok(IngestOutcome {
        receipt_id: receipt.id,
        external_payment_id: receipt.external_payment_id,
        item_count,
        created: true,
    })
}
