//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper functions
//! for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// This provides graceful error handling instead of panicking when the database
/// contains invalid enum values (from corruption, migration errors, etc.).
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    /// Construct an instance from a database row.
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const RECEIPT_COLS: &str = "id, external_payment_id, amount, currency, source, confidence_score, confidence_label, refunded, demo_refunded, demo_disputed, demo_expired_qr, created_at, updated_at";

pub const RECEIPT_ITEM_COLS: &str = "id, receipt_id, name, unit_price, quantity, created_at";

pub const SHARE_TOKEN_COLS: &str = "id, receipt_id, token, status, single_use, expires_at, used_at, verified_at, verified_by, view_count, verification_attempts, created_at";

pub const DISPUTE_COLS: &str =
    "id, receipt_id, status, reason_code, notes, total_amount_cents, created_at, updated_at";

/// Dispute columns for stores that predate the total_amount_cents column.
pub const DISPUTE_COLS_LEGACY: &str =
    "id, receipt_id, status, reason_code, notes, NULL, created_at, updated_at";

pub const DISPUTE_ITEM_COLS: &str = "id, dispute_id, receipt_item_id, quantity, amount_cents";

pub const SETTING_COLS: &str = "key, value, updated_at";

pub const EVENT_LOG_COLS: &str =
    "id, timestamp, event_type, subject_id, metadata, ip_address, user_agent";

// ============ FromRow Implementations ============

impl FromRow for Receipt {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // confidence_label is nullable - parse only when present
        let confidence_label: Option<ConfidenceLabel> = row
            .get::<_, Option<String>>(6)?
            .and_then(|s| s.parse().ok());
        Ok(Receipt {
            id: row.get(0)?,
            external_payment_id: row.get(1)?,
            amount: row.get(2)?,
            currency: row.get(3)?,
            source: parse_enum(row, 4, "source")?,
            confidence_score: row.get(5)?,
            confidence_label,
            refunded: row.get(7)?,
            demo_refunded: row.get(8)?,
            demo_disputed: row.get(9)?,
            demo_expired_qr: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }
}

impl FromRow for ReceiptItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ReceiptItem {
            id: row.get(0)?,
            receipt_id: row.get(1)?,
            name: row.get(2)?,
            unit_price: row.get(3)?,
            quantity: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for ShareToken {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ShareToken {
            id: row.get(0)?,
            receipt_id: row.get(1)?,
            token: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            single_use: row.get(4)?,
            expires_at: row.get(5)?,
            used_at: row.get(6)?,
            verified_at: row.get(7)?,
            verified_by: row.get(8)?,
            view_count: row.get(9)?,
            verification_attempts: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for Dispute {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Dispute {
            id: row.get(0)?,
            receipt_id: row.get(1)?,
            status: parse_enum(row, 2, "status")?,
            reason_code: row.get(3)?,
            notes: row.get(4)?,
            total_amount_cents: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl FromRow for DisputeItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(DisputeItem {
            id: row.get(0)?,
            dispute_id: row.get(1)?,
            receipt_item_id: row.get(2)?,
            quantity: row.get(3)?,
            amount_cents: row.get(4)?,
        })
    }
}

impl FromRow for EventLog {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(EventLog {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            event_type: row.get(2)?,
            subject_id: row.get(3)?,
            metadata: row.get(4)?,
            ip_address: row.get(5)?,
            user_agent: row.get(6)?,
        })
    }
}

impl FromRow for Setting {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Setting {
            key: row.get(0)?,
            value: row.get(1)?,
            updated_at: row.get(2)?,
        })
    }
}
