//! Payment processor boundary: wire types and the snapshot client.
//!
//! The processor is an external collaborator. Webhook payloads are parsed
//! into strict tagged types at this boundary so malformed or missing fields
//! become a BadRequest instead of propagating undefined values inward.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Payment event delivered by the processor webhook.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum PaymentEvent {
    /// A completed point-of-sale payment to materialize as a receipt.
    #[serde(rename = "payment.completed")]
    Completed {
        payment: PaymentSnapshot,
        /// Inline order snapshot; when absent, the order is fetched from the
        /// processor API using `payment.order_id` (best effort).
        #[serde(default)]
        order: Option<OrderSnapshot>,
    },
    /// A refund applied to a previously completed payment.
    #[serde(rename = "payment.refunded")]
    Refunded { payment_id: String },
    /// Event types this service does not care about, acknowledged so the
    /// processor stops redelivering them.
    #[serde(other)]
    Ignored,
}

/// Snapshot of a payment as reported by the processor.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSnapshot {
    pub id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Snapshot of an order's line items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSnapshot {
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineItem {
    pub name: String,
    pub unit_price_minor_units: i64,
    /// Processors disagree on whether quantity is a number or a string;
    /// parse failures default to 1.
    #[serde(default)]
    pub quantity: Option<Value>,
}

impl OrderLineItem {
    /// Parsed quantity, defaulting to 1 when absent, non-numeric, or < 1.
    pub fn parsed_quantity(&self) -> i64 {
        let parsed = match &self.quantity {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.filter(|q| *q >= 1).unwrap_or(1)
    }
}

/// HTTP client for processor payment/order snapshot fetches.
#[derive(Clone)]
pub struct ProcessorClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProcessorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentSnapshot> {
        self.fetch(&format!("{}/payments/{}", self.base_url, payment_id))
            .await
    }

    pub async fn get_order(&self, order_id: &str) -> Result<OrderSnapshot> {
        self.fetch(&format!("{}/orders/{}", self.base_url, order_id))
            .await
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Processor request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Processor returned {} for {}",
                response.status(),
                url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Processor response malformed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsed_quantity() {
        let item = |q: Option<Value>| OrderLineItem {
            name: "Widget".into(),
            unit_price_minor_units: 100,
            quantity: q,
        };

        assert_eq!(item(Some(Value::from(3))).parsed_quantity(), 3);
        assert_eq!(item(Some(Value::from("2"))).parsed_quantity(), 2);
        assert_eq!(item(Some(Value::from("garbage"))).parsed_quantity(), 1);
        assert_eq!(item(Some(Value::from(0))).parsed_quantity(), 1);
        assert_eq!(item(Some(Value::from(-4))).parsed_quantity(), 1);
        assert_eq!(item(None).parsed_quantity(), 1);
    }

    #[test]
    fn test_event_parsing() {
        let event: PaymentEvent = serde_json::from_str(
            r#"{"type": "payment.completed",
                "payment": {"id": "pay_1", "amount_minor_units": 2500, "currency": "usd"}}"#,
        )
        .unwrap();
        assert!(matches!(event, PaymentEvent::Completed { .. }));

        let event: PaymentEvent = serde_json::from_str(
            r#"{"type": "payment.refunded", "payment_id": "pay_1"}"#,
        )
        .unwrap();
        assert!(matches!(event, PaymentEvent::Refunded { .. }));

        let event: PaymentEvent =
            serde_json::from_str(r#"{"type": "payout.created"}"#).unwrap();
        assert!(matches!(event, PaymentEvent::Ignored));
    }
}
