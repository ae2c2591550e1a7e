//! Confidence gating for item-level visibility.
//!
//! Receipts carry an externally computed trust score. When it falls below
//! the administrator-configured threshold, line-item detail is suppressed
//! from verification responses; the receipt's existence and aggregate
//! amount are still reported.

use crate::models::{ConfidenceLabel, Receipt};

/// Whether item detail may be shown for this receipt.
///
/// HIGH-labelled receipts are always visible regardless of threshold.
/// A receipt with no score at all is visible: absence of evidence is not
/// evidence of low confidence.
pub fn is_visible(receipt: &Receipt, threshold: i64) -> bool {
    if receipt.confidence_label == Some(ConfidenceLabel::High) {
        return true;
    }
    match receipt.confidence_score {
        Some(score) => score >= threshold,
        None => true,
    }
}
