//! Prefixed ID generation for Veritill entities.
//!
//! All IDs use a `vt_` brand prefix to guarantee collision avoidance with
//! payment processor IDs (`pi_`, `ord_`, `ch_`, etc.).
//!
//! Format: `vt_{entity}_{uuid_simple}` (32 hex chars, no hyphens)

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &[
    "vt_rcp_",
    "vt_itm_",
    "vt_shr_",
    "vt_dsp_",
    "vt_dit_",
    "vt_evt_",
];

/// Validate that a string is a valid Veritill prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `vt_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    // Must start with a known prefix
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    // Get the hex part after the prefix
    let hex_part = &s[prefix.len()..];

    // Must be exactly 32 hex characters
    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Veritill.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    Receipt,
    ReceiptItem,
    ShareToken,
    Dispute,
    DisputeItem,
    EventLog,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Receipt => "vt_rcp",
            Self::ReceiptItem => "vt_itm",
            Self::ShareToken => "vt_shr",
            Self::Dispute => "vt_dsp",
            Self::DisputeItem => "vt_dit",
            Self::EventLog => "vt_evt",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}
