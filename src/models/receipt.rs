use serde::{Deserialize, Serialize};

/// How a receipt entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptSource {
    /// Materialized from a payment processor webhook delivery
    Webhook,
    /// Created by demo tooling; demo override flags apply
    Simulated,
}

impl ReceiptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Simulated => "simulated",
        }
    }
}

impl std::str::FromStr for ReceiptSource {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "webhook" => Ok(Self::Webhook),
            "simulated" => Ok(Self::Simulated),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ReceiptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Externally computed trust label for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

impl std::str::FromStr for ConfidenceLabel {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One receipt per successfully ingested payment.
///
/// `external_payment_id` is unique, which makes ingestion idempotent under
/// webhook redelivery. The refund flag and confidence fields are mutated by
/// external collaborators (refund events, scoring engine) after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    /// Payment processor's payment id (unique - at most one receipt per payment)
    pub external_payment_id: String,
    /// Decimal currency amount (converted from processor minor units)
    pub amount: f64,
    /// ISO currency code, lowercase (e.g. "usd")
    pub currency: String,
    pub source: ReceiptSource,
    pub confidence_score: Option<i64>,
    pub confidence_label: Option<ConfidenceLabel>,
    pub refunded: bool,
    /// Demo overrides, only honored when source = simulated
    pub demo_refunded: bool,
    pub demo_disputed: bool,
    pub demo_expired_qr: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Line item owned by exactly one receipt; immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptItem {
    pub id: String,
    pub receipt_id: String,
    pub name: String,
    /// Decimal unit price
    pub unit_price: f64,
    pub quantity: i64,
    pub created_at: i64,
}

/// Input for demo receipt creation (dev tooling).
#[derive(Debug, Deserialize)]
pub struct CreateSimulatedReceipt {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub items: Vec<SimulatedItem>,
    #[serde(default)]
    pub demo_refunded: bool,
    #[serde(default)]
    pub demo_disputed: bool,
    #[serde(default)]
    pub demo_expired_qr: bool,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SimulatedItem {
    pub name: String,
    pub unit_price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Demo override flag updates; `None` leaves a flag untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateDemoOverrides {
    pub demo_refunded: Option<bool>,
    pub demo_disputed: Option<bool>,
    pub demo_expired_qr: Option<bool>,
}
