use serde::{Deserialize, Serialize};

/// Setting keys stored in the `settings` key-value table.
///
/// All reads go through typed accessors in `db::queries` that fall back to
/// the defaults below when a key is unset, so a fresh database behaves
/// sensibly without any administrative setup.
pub mod keys {
    pub const CONFIDENCE_THRESHOLD: &str = "confidence_threshold";
    pub const SINGLE_USE_DEFAULT: &str = "single_use_default";
    pub const VERIFICATION_ENABLED: &str = "verification_enabled";
    pub const RETENTION_DAYS: &str = "retention_days";
}

/// Default confidence threshold (0-100) below which item detail is hidden.
pub const DEFAULT_CONFIDENCE_THRESHOLD: i64 = 85;

/// Default single-use flag applied to new share tokens.
pub const DEFAULT_SINGLE_USE: bool = false;

/// Default event log retention in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

/// A raw settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}

/// Fully resolved settings (stored values merged with defaults).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSettings {
    pub confidence_threshold: i64,
    pub single_use_default: bool,
    pub verification_enabled: bool,
    pub retention_days: i64,
}

/// Partial settings update; `None` leaves a setting untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettings {
    pub confidence_threshold: Option<i64>,
    pub single_use_default: Option<bool>,
    pub verification_enabled: Option<bool>,
    pub retention_days: Option<i64>,
}
