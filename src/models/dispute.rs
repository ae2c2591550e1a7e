use serde::{Deserialize, Serialize};

/// Dispute lifecycle status. Only `submitted` and `in_review` count as
/// active for verification purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Submitted,
    InReview,
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::InReview => "in_review",
            Self::Resolved => "resolved",
        }
    }

    /// Whether this dispute should influence verification state.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::InReview)
    }
}

impl std::str::FromStr for DisputeStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "in_review" => Ok(Self::InReview),
            "resolved" => Ok(Self::Resolved),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer dispute against one receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: String,
    pub receipt_id: String,
    pub status: DisputeStatus,
    pub reason_code: String,
    pub notes: Option<String>,
    /// Disputed subtotal in minor units; None when the store predates the
    /// amount-tracking column
    pub total_amount_cents: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One disputed line item, referencing a receipt item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeItem {
    pub id: String,
    pub dispute_id: String,
    pub receipt_item_id: String,
    pub quantity: i64,
    /// unit_price x quantity, rounded to the nearest cent
    pub amount_cents: i64,
}

/// A caller's selection of one receipt item to dispute.
#[derive(Debug, Deserialize)]
pub struct DisputeItemSelection {
    pub receipt_item_id: String,
    /// Defaults to the full receipt-item quantity when omitted
    pub quantity: Option<i64>,
}

/// Dispute submission input.
#[derive(Debug, Deserialize)]
pub struct CreateDispute {
    pub selected_items: Vec<DisputeItemSelection>,
    pub reason_code: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Admin dispute status transition.
#[derive(Debug, Deserialize)]
pub struct UpdateDisputeStatus {
    pub status: DisputeStatus,
}
