//! Shared utility functions for the Veritill application.

use axum::http::HeaderMap;

/// Convert a payment processor minor-unit amount (cents) to a decimal
/// currency amount.
pub fn minor_units_to_amount(minor_units: i64) -> f64 {
    minor_units as f64 / 100.0
}

/// Convert a decimal unit price to minor units, rounded to the nearest cent.
///
/// Disputed subtotals are computed from this, so rounding happens per unit
/// price before multiplying by quantity.
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Extract client IP address and user-agent from request headers.
///
/// Tries `x-forwarded-for` first (for proxied requests), then `x-real-ip`,
/// and extracts the `user-agent` header for event logging.
pub fn extract_request_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    (ip, user_agent)
}
