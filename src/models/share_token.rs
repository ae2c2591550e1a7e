use serde::{Deserialize, Serialize};

/// Stored status of a share token.
///
/// Status is bookkeeping, not truth: the verification resolver re-derives
/// the effective state on every read (a stored `active` token past its
/// `expires_at` still resolves EXPIRED).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareTokenStatus {
    Active,
    Verified,
    Used,
    Voided,
    Expired,
}

impl ShareTokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Verified => "verified",
            Self::Used => "used",
            Self::Voided => "voided",
            Self::Expired => "expired",
        }
    }
}

impl std::str::FromStr for ShareTokenStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "verified" => Ok(Self::Verified),
            "used" => Ok(Self::Used),
            "voided" => Ok(Self::Voided),
            "expired" => Ok(Self::Expired),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for ShareTokenStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A capability granting read access to one receipt's verification data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareToken {
    pub id: String,
    pub receipt_id: String,
    /// Opaque bearer string, globally unique
    pub token: String,
    pub status: ShareTokenStatus,
    /// Valid for exactly one successful read when set (fixed at creation)
    pub single_use: bool,
    pub expires_at: Option<i64>,
    pub used_at: Option<i64>,
    pub verified_at: Option<i64>,
    pub verified_by: Option<String>,
    pub view_count: i64,
    pub verification_attempts: i64,
    pub created_at: i64,
}

/// Options for share token creation.
#[derive(Debug, Deserialize)]
pub struct CreateShareToken {
    pub expires_at: Option<i64>,
    /// Caller override; falls back to the configured default, then false
    pub single_use: Option<bool>,
    /// When true, an existing non-expiring token for the receipt is returned
    /// instead of minting a new one (one durable link per receipt).
    #[serde(default = "default_reuse_existing")]
    pub reuse_existing: bool,
}

fn default_reuse_existing() -> bool {
    true
}

impl Default for CreateShareToken {
    fn default() -> Self {
        Self {
            expires_at: None,
            single_use: None,
            reuse_existing: true,
        }
    }
}

/// View/attempt counters surfaced alongside verification results.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShareCounters {
    pub view_count: i64,
    pub verification_attempts: i64,
}

impl From<&ShareToken> for ShareCounters {
    fn from(share: &ShareToken) -> Self {
        Self {
            view_count: share.view_count,
            verification_attempts: share.verification_attempts,
        }
    }
}
