//! Verification state resolution.
//!
//! `resolve` is a pure function of its inputs at call time: no clocks, no
//! store access. The precedence order is load-bearing - expiry and
//! revocation are checked before any business-state classification, because
//! a voided or expired token must never be trusted to reflect current
//! receipt status.

use serde::Serialize;

use crate::models::{Dispute, Receipt, ReceiptSource, ShareToken, ShareTokenStatus};

/// Resolved classification of a token + receipt pair at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationState {
    Valid,
    Refunded,
    Disputed,
    Expired,
    Invalid,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
            Self::Expired => "expired",
            Self::Invalid => "invalid",
        }
    }

    /// Human-readable reason for merchant-facing non-VALID results.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Valid => None,
            Self::Refunded => Some("This purchase has been refunded"),
            Self::Disputed => Some("This purchase is under dispute"),
            Self::Expired => Some("This verification link has expired"),
            Self::Invalid => Some("This verification link is not valid"),
        }
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Demo override chain for simulated receipts, evaluated in order.
///
/// Folding the overrides into one tagged value keeps the resolver from
/// duplicating the REFUNDED/DISPUTED branches for the demo path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoOverride {
    None,
    ExpiredQr,
    Refunded,
    Disputed,
}

impl DemoOverride {
    /// Extract the first matching override from a simulated receipt's flags.
    /// Always `None` for webhook-sourced receipts.
    pub fn from_receipt(receipt: &Receipt) -> Self {
        if receipt.source != ReceiptSource::Simulated {
            return Self::None;
        }
        if receipt.demo_expired_qr {
            Self::ExpiredQr
        } else if receipt.demo_refunded {
            Self::Refunded
        } else if receipt.demo_disputed {
            Self::Disputed
        } else {
            Self::None
        }
    }
}

/// Classify a token + receipt + disputes snapshot. First match wins:
///
/// 1. token expired (wall clock past expires_at)
/// 2. token absent or voided
/// 3. single-use token already consumed
/// 4. receipt absent
/// 5. simulated receipt demo overrides (expired-qr, refunded, disputed),
///    falling through to the real-state checks when none is set
/// 6. receipt refunded
/// 7. any active dispute
/// 8. valid
pub fn resolve(
    share: Option<&ShareToken>,
    receipt: Option<&Receipt>,
    active_disputes: &[Dispute],
    now: i64,
) -> VerificationState {
    if let Some(share) = share {
        if share.expires_at.is_some_and(|exp| exp < now) {
            return VerificationState::Expired;
        }
        if share.status == ShareTokenStatus::Voided {
            return VerificationState::Invalid;
        }
        if share.single_use && share.used_at.is_some() {
            return VerificationState::Invalid;
        }
    } else {
        return VerificationState::Invalid;
    }

    let Some(receipt) = receipt else {
        return VerificationState::Invalid;
    };

    match DemoOverride::from_receipt(receipt) {
        DemoOverride::ExpiredQr => return VerificationState::Expired,
        DemoOverride::Refunded => return VerificationState::Refunded,
        DemoOverride::Disputed => return VerificationState::Disputed,
        // Simulated receipts with no override take the same path as live ones
        DemoOverride::None => {}
    }

    if receipt.refunded {
        return VerificationState::Refunded;
    }

    if active_disputes.iter().any(|d| d.status.is_active()) {
        return VerificationState::Disputed;
    }

    VerificationState::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLabel, DisputeStatus};

    const NOW: i64 = 1_700_000_000;

    fn receipt(source: ReceiptSource) -> Receipt {
        Receipt {
            id: "vt_rcp_00000000000000000000000000000001".into(),
            external_payment_id: "pay_1".into(),
            amount: 25.0,
            currency: "usd".into(),
            source,
            confidence_score: Some(90),
            confidence_label: Some(ConfidenceLabel::High),
            refunded: false,
            demo_refunded: false,
            demo_disputed: false,
            demo_expired_qr: false,
            created_at: NOW - 1000,
            updated_at: NOW - 1000,
        }
    }

    fn share() -> ShareToken {
        ShareToken {
            id: "vt_shr_00000000000000000000000000000001".into(),
            receipt_id: "vt_rcp_00000000000000000000000000000001".into(),
            token: "tok".into(),
            status: ShareTokenStatus::Active,
            single_use: false,
            expires_at: None,
            used_at: None,
            verified_at: None,
            verified_by: None,
            view_count: 0,
            verification_attempts: 0,
            created_at: NOW - 1000,
        }
    }

    fn dispute(status: DisputeStatus) -> Dispute {
        Dispute {
            id: "vt_dsp_00000000000000000000000000000001".into(),
            receipt_id: "vt_rcp_00000000000000000000000000000001".into(),
            status,
            reason_code: "item_missing".into(),
            notes: None,
            total_amount_cents: Some(1000),
            created_at: NOW - 500,
            updated_at: NOW - 500,
        }
    }

    #[test]
    fn valid_when_nothing_is_wrong() {
        let s = share();
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Valid);
    }

    #[test]
    fn absent_share_is_invalid() {
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(None, Some(&r), &[], NOW), VerificationState::Invalid);
    }

    #[test]
    fn absent_receipt_is_invalid() {
        let s = share();
        assert_eq!(resolve(Some(&s), None, &[], NOW), VerificationState::Invalid);
    }

    #[test]
    fn expired_token() {
        let mut s = share();
        s.expires_at = Some(NOW - 1);
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Expired);
    }

    #[test]
    fn unexpired_deadline_does_not_trip() {
        let mut s = share();
        s.expires_at = Some(NOW + 3600);
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Valid);
    }

    #[test]
    fn expiry_precedes_void() {
        // A voided token with a past deadline resolves EXPIRED, never INVALID
        let mut s = share();
        s.expires_at = Some(NOW - 1);
        s.status = ShareTokenStatus::Voided;
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Expired);
    }

    #[test]
    fn voided_token_is_invalid() {
        let mut s = share();
        s.status = ShareTokenStatus::Voided;
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Invalid);
    }

    #[test]
    fn consumed_single_use_is_invalid() {
        let mut s = share();
        s.single_use = true;
        s.used_at = Some(NOW - 10);
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Invalid);
    }

    #[test]
    fn unconsumed_single_use_is_valid() {
        let mut s = share();
        s.single_use = true;
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Valid);
    }

    #[test]
    fn void_precedes_refund_classification() {
        let mut s = share();
        s.status = ShareTokenStatus::Voided;
        let mut r = receipt(ReceiptSource::Webhook);
        r.refunded = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Invalid);
    }

    #[test]
    fn refunded_receipt() {
        let s = share();
        let mut r = receipt(ReceiptSource::Webhook);
        r.refunded = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Refunded);
    }

    #[test]
    fn active_dispute_classifies_disputed() {
        let s = share();
        let r = receipt(ReceiptSource::Webhook);
        for status in [DisputeStatus::Submitted, DisputeStatus::InReview] {
            assert_eq!(
                resolve(Some(&s), Some(&r), &[dispute(status)], NOW),
                VerificationState::Disputed
            );
        }
    }

    #[test]
    fn resolved_dispute_does_not_classify() {
        let s = share();
        let r = receipt(ReceiptSource::Webhook);
        assert_eq!(
            resolve(Some(&s), Some(&r), &[dispute(DisputeStatus::Resolved)], NOW),
            VerificationState::Valid
        );
    }

    #[test]
    fn refund_precedes_dispute() {
        let s = share();
        let mut r = receipt(ReceiptSource::Webhook);
        r.refunded = true;
        assert_eq!(
            resolve(Some(&s), Some(&r), &[dispute(DisputeStatus::Submitted)], NOW),
            VerificationState::Refunded
        );
    }

    #[test]
    fn demo_override_order() {
        let s = share();

        let mut r = receipt(ReceiptSource::Simulated);
        r.demo_expired_qr = true;
        r.demo_refunded = true;
        r.demo_disputed = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Expired);

        let mut r = receipt(ReceiptSource::Simulated);
        r.demo_refunded = true;
        r.demo_disputed = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Refunded);

        let mut r = receipt(ReceiptSource::Simulated);
        r.demo_disputed = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Disputed);
    }

    #[test]
    fn simulated_without_overrides_falls_through_to_real_flags() {
        let s = share();

        let r = receipt(ReceiptSource::Simulated);
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Valid);

        let mut r = receipt(ReceiptSource::Simulated);
        r.refunded = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Refunded);
    }

    #[test]
    fn demo_flags_ignored_on_webhook_receipts() {
        let s = share();
        let mut r = receipt(ReceiptSource::Webhook);
        r.demo_refunded = true;
        r.demo_expired_qr = true;
        assert_eq!(resolve(Some(&s), Some(&r), &[], NOW), VerificationState::Valid);
    }

    #[test]
    fn resolve_is_deterministic() {
        let s = share();
        let r = receipt(ReceiptSource::Webhook);
        let disputes = [dispute(DisputeStatus::Submitted)];
        let first = resolve(Some(&s), Some(&r), &disputes, NOW);
        let second = resolve(Some(&s), Some(&r), &disputes, NOW);
        assert_eq!(first, second);
    }
}
