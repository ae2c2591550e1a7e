use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{AppError, Result};
use crate::id::EntityType;
use crate::models::*;
use crate::token;
use crate::util::amount_to_cents;

use super::from_row::{
    query_all, query_one, DISPUTE_COLS, DISPUTE_COLS_LEGACY, DISPUTE_ITEM_COLS, RECEIPT_COLS,
    RECEIPT_ITEM_COLS, SETTING_COLS, SHARE_TOKEN_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

/// Whether an error is a SQLite uniqueness-constraint violation.
///
/// Uniqueness constraints are the sole serialization point for concurrent
/// inserts (duplicate webhook delivery, token collision), so callers need
/// to distinguish this case from real failures.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Whether an error indicates the named column is absent from the store.
fn is_missing_column(e: &rusqlite::Error, column: &str) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(_, Some(msg))
            if msg.contains("no such column") && msg.contains(column)
    )
}

// ============ Receipts ============

/// Insert a receipt for a payment, or return the pre-existing one.
///
/// The UNIQUE constraint on external_payment_id is what makes ingestion
/// idempotent: the loser of a concurrent insert race fetches and returns
/// the winner's row. The bool is true when this call created the row.
pub fn create_receipt(
    conn: &Connection,
    external_payment_id: &str,
    amount: f64,
    currency: &str,
    source: ReceiptSource,
) -> Result<(Receipt, bool)> {
    let id = EntityType::Receipt.gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO receipts (id, external_payment_id, amount, currency, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![&id, external_payment_id, amount, currency, source.as_str(), now, now],
    );

    match inserted {
        Ok(_) => Ok((
            Receipt {
                id,
                external_payment_id: external_payment_id.to_string(),
                amount,
                currency: currency.to_string(),
                source,
                confidence_score: None,
                confidence_label: None,
                refunded: false,
                demo_refunded: false,
                demo_disputed: false,
                demo_expired_qr: false,
                created_at: now,
                updated_at: now,
            },
            true,
        )),
        Err(e) if is_unique_violation(&e) => {
            let existing = get_receipt_by_external_id(conn, external_payment_id)?
                .ok_or_else(|| AppError::Conflict(format!(
                    "Receipt for payment {} exists but could not be read back",
                    external_payment_id
                )))?;
            Ok((existing, false))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_receipt_by_id(conn: &Connection, id: &str) -> Result<Option<Receipt>> {
    // Malformed ids cannot exist; skip the query
    if !crate::id::is_valid_prefixed_id(id) {
        return Ok(None);
    }
    query_one(
        conn,
        &format!("SELECT {} FROM receipts WHERE id = ?1", RECEIPT_COLS),
        &[&id],
    )
}

pub fn get_receipt_by_external_id(
    conn: &Connection,
    external_payment_id: &str,
) -> Result<Option<Receipt>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM receipts WHERE external_payment_id = ?1",
            RECEIPT_COLS
        ),
        &[&external_payment_id],
    )
}

/// Bulk-insert receipt items from order line items. Returns the rows created.
pub fn create_receipt_items(
    conn: &Connection,
    receipt_id: &str,
    items: &[(String, f64, i64)],
) -> Result<Vec<ReceiptItem>> {
    let now = now();
    let mut created = Vec::with_capacity(items.len());

    let mut stmt = conn.prepare(
        "INSERT INTO receipt_items (id, receipt_id, name, unit_price, quantity, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (name, unit_price, quantity) in items {
        let id = EntityType::ReceiptItem.gen_id();
        stmt.execute(params![&id, receipt_id, name, unit_price, quantity, now])?;
        created.push(ReceiptItem {
            id,
            receipt_id: receipt_id.to_string(),
            name: name.clone(),
            unit_price: *unit_price,
            quantity: *quantity,
            created_at: now,
        });
    }

    Ok(created)
}

pub fn list_receipt_items(conn: &Connection, receipt_id: &str) -> Result<Vec<ReceiptItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM receipt_items WHERE receipt_id = ?1 ORDER BY created_at, id",
            RECEIPT_ITEM_COLS
        ),
        &[&receipt_id],
    )
}

/// Mark the receipt for an external payment as refunded. Returns the updated
/// receipt, or None when no receipt exists for that payment.
pub fn mark_receipt_refunded(
    conn: &Connection,
    external_payment_id: &str,
) -> Result<Option<Receipt>> {
    conn.query_row(
        &format!(
            "UPDATE receipts SET refunded = 1, updated_at = ?1
             WHERE external_payment_id = ?2 RETURNING {}",
            RECEIPT_COLS
        ),
        params![now(), external_payment_id],
        super::from_row::FromRow::from_row,
    )
    .optional()
    .map_err(Into::into)
}

/// Record an externally computed confidence score/label for a receipt.
pub fn update_receipt_confidence(
    conn: &Connection,
    receipt_id: &str,
    score: Option<i64>,
    label: Option<ConfidenceLabel>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE receipts SET confidence_score = ?1, confidence_label = ?2, updated_at = ?3
         WHERE id = ?4",
        params![score, label.map(|l| l.as_str()), now(), receipt_id],
    )?;
    Ok(affected > 0)
}

/// Create a simulated receipt with optional items and demo override flags.
/// Simulated receipts get a synthetic external payment id.
pub fn create_simulated_receipt(
    conn: &Connection,
    input: &CreateSimulatedReceipt,
) -> Result<(Receipt, Vec<ReceiptItem>)> {
    let id = EntityType::Receipt.gen_id();
    let external_payment_id = format!("sim_{}", token::generate(16));
    let now = now();

    conn.execute(
        "INSERT INTO receipts (id, external_payment_id, amount, currency, source,
                               demo_refunded, demo_disputed, demo_expired_qr, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'simulated', ?5, ?6, ?7, ?8, ?9)",
        params![
            &id,
            &external_payment_id,
            input.amount,
            &input.currency,
            input.demo_refunded,
            input.demo_disputed,
            input.demo_expired_qr,
            now,
            now
        ],
    )?;

    let items: Vec<(String, f64, i64)> = input
        .items
        .iter()
        .map(|i| (i.name.clone(), i.unit_price, i.quantity.max(1)))
        .collect();
    let items = create_receipt_items(conn, &id, &items)?;

    let receipt = get_receipt_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("Simulated receipt vanished after insert".into()))?;
    Ok((receipt, items))
}

/// Toggle demo override flags on a simulated receipt.
///
/// Rejected for webhook-sourced receipts: overrides are demo tooling and
/// must never shadow real payment state.
pub fn update_demo_overrides(
    conn: &Connection,
    receipt_id: &str,
    input: &UpdateDemoOverrides,
) -> Result<Receipt> {
    let receipt = get_receipt_by_id(conn, receipt_id)?
        .ok_or_else(|| AppError::NotFound(format!("Receipt not found: {}", receipt_id)))?;

    if receipt.source != ReceiptSource::Simulated {
        return Err(AppError::BadRequest(
            "Demo overrides only apply to simulated receipts".into(),
        ));
    }

    conn.query_row(
        &format!(
            "UPDATE receipts SET
                demo_refunded = COALESCE(?1, demo_refunded),
                demo_disputed = COALESCE(?2, demo_disputed),
                demo_expired_qr = COALESCE(?3, demo_expired_qr),
                updated_at = ?4
             WHERE id = ?5 RETURNING {}",
            RECEIPT_COLS
        ),
        params![
            input.demo_refunded,
            input.demo_disputed,
            input.demo_expired_qr,
            now(),
            receipt_id
        ],
        super::from_row::FromRow::from_row,
    )
    .map_err(Into::into)
}

// ============ Share Tokens ============

/// Retry bound for token generation. Collisions at 32 chars of URL-safe
/// randomness are vanishingly rare; the bound exists so a pathological
/// store cannot loop forever.
const TOKEN_GENERATION_ATTEMPTS: u32 = 5;

pub fn get_share_token_by_token(conn: &Connection, token: &str) -> Result<Option<ShareToken>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM share_tokens WHERE token = ?1",
            SHARE_TOKEN_COLS
        ),
        &[&token],
    )
}

/// First non-expiring token for a receipt, if any (the reuse candidate).
fn get_durable_share_token(conn: &Connection, receipt_id: &str) -> Result<Option<ShareToken>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM share_tokens
             WHERE receipt_id = ?1 AND expires_at IS NULL
             ORDER BY created_at, id LIMIT 1",
            SHARE_TOKEN_COLS
        ),
        &[&receipt_id],
    )
}

/// Create a share token for a receipt, or return the existing durable one.
///
/// Reuse is an explicit policy: with `reuse_existing` set (the default), a
/// receipt keeps one durable non-expiring link; callers wanting a second,
/// independent link pass `reuse_existing: false`.
///
/// The bool is true when a new token was minted.
pub fn create_or_get_share_token(
    conn: &Connection,
    receipt_id: &str,
    input: &CreateShareToken,
) -> Result<(ShareToken, bool)> {
    get_receipt_by_id(conn, receipt_id)?
        .ok_or_else(|| AppError::NotFound(format!("Receipt not found: {}", receipt_id)))?;

    if input.reuse_existing {
        if let Some(existing) = get_durable_share_token(conn, receipt_id)? {
            return Ok((existing, false));
        }
    }

    // Caller value wins, then the administrator-configured default
    let single_use = match input.single_use {
        Some(v) => v,
        None => get_single_use_default(conn)?,
    };

    let now = now();
    for _ in 0..TOKEN_GENERATION_ATTEMPTS {
        let candidate = token::generate(token::SHARE_TOKEN_LENGTH);
        let id = EntityType::ShareToken.gen_id();

        // Generation and uniqueness check are not atomic; the UNIQUE
        // constraint on token catches the race and we just try again.
        let inserted = conn.execute(
            "INSERT INTO share_tokens (id, receipt_id, token, status, single_use, expires_at,
                                       view_count, verification_attempts, created_at)
             VALUES (?1, ?2, ?3, 'active', ?4, ?5, 0, 0, ?6)",
            params![&id, receipt_id, &candidate, single_use, input.expires_at, now],
        );

        match inserted {
            Ok(_) => {
                return Ok((
                    ShareToken {
                        id,
                        receipt_id: receipt_id.to_string(),
                        token: candidate,
                        status: ShareTokenStatus::Active,
                        single_use,
                        expires_at: input.expires_at,
                        used_at: None,
                        verified_at: None,
                        verified_by: None,
                        view_count: 0,
                        verification_attempts: 0,
                        created_at: now,
                    },
                    true,
                ));
            }
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!("Share token collision for receipt {}, retrying", receipt_id);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::TokenGenerationExhausted)
}

/// Void a share token unconditionally. Idempotent: voiding an already-voided
/// token succeeds. Returns false only when no such token exists.
pub fn void_share_token(conn: &Connection, token: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE share_tokens SET status = 'voided' WHERE token = ?1",
        params![token],
    )?;
    Ok(affected > 0)
}

/// Record one verification attempt against a share token.
///
/// Counters increment unconditionally - INVALID and EXPIRED attempts are
/// counted too, as abuse-monitoring signal. `mark_expired` persists the
/// one-time lazy active->expired transition; `consume` sets used_at on the
/// first successful read of a single-use token. All of it is one UPDATE so
/// the consumption check and write cannot be split by a concurrent reader.
pub fn record_verification_attempt(
    conn: &Connection,
    share_id: &str,
    mark_expired: bool,
    consume: bool,
) -> Result<ShareToken> {
    conn.query_row(
        &format!(
            "UPDATE share_tokens SET
                view_count = view_count + 1,
                verification_attempts = verification_attempts + 1,
                status = CASE WHEN ?1 THEN 'expired' ELSE status END,
                used_at = CASE WHEN ?2 AND used_at IS NULL THEN ?3 ELSE used_at END
             WHERE id = ?4 RETURNING {}",
            SHARE_TOKEN_COLS
        ),
        params![mark_expired, consume, now(), share_id],
        super::from_row::FromRow::from_row,
    )
    .map_err(Into::into)
}

/// Merchant-facing verification transition: active -> verified, recording
/// who verified and when; `mark_used` further transitions to used.
pub fn mark_share_token_verified(
    conn: &Connection,
    share_id: &str,
    actor_id: Option<&str>,
    mark_used: bool,
) -> Result<ShareToken> {
    let now = now();
    conn.query_row(
        &format!(
            "UPDATE share_tokens SET
                status = CASE
                    WHEN ?1 THEN 'used'
                    WHEN status = 'active' THEN 'verified'
                    ELSE status
                END,
                verified_at = ?2,
                verified_by = COALESCE(?3, verified_by),
                used_at = CASE WHEN ?1 AND used_at IS NULL THEN ?2 ELSE used_at END
             WHERE id = ?4 RETURNING {}",
            SHARE_TOKEN_COLS
        ),
        params![mark_used, now, actor_id, share_id],
        super::from_row::FromRow::from_row,
    )
    .map_err(Into::into)
}

// ============ Disputes ============

/// Validate and create a dispute with its selected items.
///
/// Validation failures surface synchronously; item-insert failures after the
/// dispute row exists are logged and swallowed (partial-failure tolerance,
/// same policy as ingestion).
pub fn create_dispute(
    conn: &Connection,
    receipt_id: &str,
    input: &CreateDispute,
) -> Result<(Dispute, Vec<DisputeItem>)> {
    get_receipt_by_id(conn, receipt_id)?
        .ok_or_else(|| AppError::NotFound(format!("Receipt not found: {}", receipt_id)))?;

    if input.selected_items.is_empty() {
        return Err(AppError::BadRequest(
            "A dispute must select at least one item".into(),
        ));
    }

    let receipt_items = list_receipt_items(conn, receipt_id)?;

    // Resolve each selection against the receipt's own items and compute
    // the disputed subtotal. Rounding happens per unit price, then scales
    // by quantity.
    let mut resolved: Vec<(String, i64, i64)> = Vec::with_capacity(input.selected_items.len());
    let mut total_amount_cents: i64 = 0;

    for selection in &input.selected_items {
        let item = receipt_items
            .iter()
            .find(|i| i.id == selection.receipt_item_id)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Item {} does not belong to receipt {}",
                    selection.receipt_item_id, receipt_id
                ))
            })?;

        let quantity = selection.quantity.unwrap_or(item.quantity);
        if quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Disputed quantity must be positive for item {}",
                item.id
            )));
        }
        if quantity > item.quantity {
            return Err(AppError::BadRequest(format!(
                "Disputed quantity {} exceeds receipt quantity {} for item {}",
                quantity, item.quantity, item.id
            )));
        }

        let amount_cents = amount_to_cents(item.unit_price) * quantity;
        total_amount_cents += amount_cents;
        resolved.push((item.id.clone(), quantity, amount_cents));
    }

    let dispute = insert_dispute(conn, receipt_id, input, total_amount_cents)?;

    let mut dispute_items = Vec::with_capacity(resolved.len());
    for (receipt_item_id, quantity, amount_cents) in resolved {
        let item_id = EntityType::DisputeItem.gen_id();
        let inserted = conn.execute(
            "INSERT INTO dispute_items (id, dispute_id, receipt_item_id, quantity, amount_cents)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&item_id, &dispute.id, &receipt_item_id, quantity, amount_cents],
        );
        match inserted {
            Ok(_) => dispute_items.push(DisputeItem {
                id: item_id,
                dispute_id: dispute.id.clone(),
                receipt_item_id,
                quantity,
                amount_cents,
            }),
            // The dispute stands even if an item row fails; the submission
            // already happened from the customer's point of view.
            Err(e) => {
                tracing::warn!(
                    "Failed to insert dispute item for dispute {}: {}",
                    dispute.id,
                    e
                );
            }
        }
    }

    Ok((dispute, dispute_items))
}

/// Insert the dispute row, degrading gracefully when the store's schema
/// predates the total_amount_cents column (capability fallback, not a
/// business rule).
fn insert_dispute(
    conn: &Connection,
    receipt_id: &str,
    input: &CreateDispute,
    total_amount_cents: i64,
) -> Result<Dispute> {
    let id = EntityType::Dispute.gen_id();
    let now = now();

    let inserted = conn.execute(
        "INSERT INTO disputes (id, receipt_id, status, reason_code, notes, total_amount_cents, created_at, updated_at)
         VALUES (?1, ?2, 'submitted', ?3, ?4, ?5, ?6, ?7)",
        params![&id, receipt_id, &input.reason_code, &input.notes, total_amount_cents, now, now],
    );

    let stored_total = match inserted {
        Ok(_) => Some(total_amount_cents),
        Err(e) if is_missing_column(&e, "total_amount_cents") => {
            tracing::warn!(
                "Store lacks total_amount_cents column, inserting dispute {} without it",
                id
            );
            conn.execute(
                "INSERT INTO disputes (id, receipt_id, status, reason_code, notes, created_at, updated_at)
                 VALUES (?1, ?2, 'submitted', ?3, ?4, ?5, ?6)",
                params![&id, receipt_id, &input.reason_code, &input.notes, now, now],
            )?;
            None
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Dispute {
        id,
        receipt_id: receipt_id.to_string(),
        status: DisputeStatus::Submitted,
        reason_code: input.reason_code.clone(),
        notes: input.notes.clone(),
        total_amount_cents: stored_total,
        created_at: now,
        updated_at: now,
    })
}

pub fn get_dispute_by_id(conn: &Connection, id: &str) -> Result<Option<Dispute>> {
    query_one(
        conn,
        &format!("SELECT {} FROM disputes WHERE id = ?1", DISPUTE_COLS),
        &[&id],
    )
}

/// Disputes that influence verification state (submitted or in_review).
pub fn get_active_disputes(conn: &Connection, receipt_id: &str) -> Result<Vec<Dispute>> {
    let result = query_all(
        conn,
        &format!(
            "SELECT {} FROM disputes
             WHERE receipt_id = ?1 AND status IN ('submitted', 'in_review')
             ORDER BY created_at DESC",
            DISPUTE_COLS
        ),
        &[&receipt_id],
    );

    match result {
        Err(AppError::Database(ref e)) if is_missing_column(e, "total_amount_cents") => query_all(
            conn,
            &format!(
                "SELECT {} FROM disputes
                 WHERE receipt_id = ?1 AND status IN ('submitted', 'in_review')
                 ORDER BY created_at DESC",
                DISPUTE_COLS_LEGACY
            ),
            &[&receipt_id],
        ),
        other => other,
    }
}

pub fn list_dispute_items(conn: &Connection, dispute_id: &str) -> Result<Vec<DisputeItem>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM dispute_items WHERE dispute_id = ?1",
            DISPUTE_ITEM_COLS
        ),
        &[&dispute_id],
    )
}

pub fn update_dispute_status(
    conn: &Connection,
    dispute_id: &str,
    status: DisputeStatus,
) -> Result<Option<Dispute>> {
    conn.query_row(
        &format!(
            "UPDATE disputes SET status = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {}",
            DISPUTE_COLS
        ),
        params![status.as_str(), now(), dispute_id],
        super::from_row::FromRow::from_row,
    )
    .optional()
    .map_err(Into::into)
}

// ============ Settings ============

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let setting: Option<Setting> = query_one(
        conn,
        &format!("SELECT {} FROM settings WHERE key = ?1", SETTING_COLS),
        &[&key],
    )?;
    Ok(setting.map(|s| s.value))
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now()],
    )?;
    Ok(())
}

/// Confidence threshold (0-100) below which item detail is hidden.
/// Unset or unparseable values fall back to the default.
pub fn get_confidence_threshold(conn: &Connection) -> Result<i64> {
    Ok(get_setting(conn, keys::CONFIDENCE_THRESHOLD)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD))
}

/// Default single-use flag for newly minted share tokens.
pub fn get_single_use_default(conn: &Connection) -> Result<bool> {
    Ok(get_setting(conn, keys::SINGLE_USE_DEFAULT)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SINGLE_USE))
}

/// Kill switch for the public verification surface.
pub fn get_verification_enabled(conn: &Connection) -> Result<bool> {
    Ok(get_setting(conn, keys::VERIFICATION_ENABLED)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(true))
}

pub fn get_retention_days(conn: &Connection) -> Result<i64> {
    Ok(get_setting(conn, keys::RETENTION_DAYS)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_RETENTION_DAYS))
}

pub fn get_resolved_settings(conn: &Connection) -> Result<ResolvedSettings> {
    Ok(ResolvedSettings {
        confidence_threshold: get_confidence_threshold(conn)?,
        single_use_default: get_single_use_default(conn)?,
        verification_enabled: get_verification_enabled(conn)?,
        retention_days: get_retention_days(conn)?,
    })
}

/// Apply a partial settings update after range validation.
pub fn apply_settings_update(conn: &Connection, input: &UpdateSettings) -> Result<ResolvedSettings> {
    if let Some(threshold) = input.confidence_threshold {
        if !(0..=100).contains(&threshold) {
            return Err(AppError::BadRequest(format!(
                "Confidence threshold must be between 0 and 100, got {}",
                threshold
            )));
        }
        set_setting(conn, keys::CONFIDENCE_THRESHOLD, &threshold.to_string())?;
    }

    if let Some(single_use) = input.single_use_default {
        set_setting(conn, keys::SINGLE_USE_DEFAULT, &single_use.to_string())?;
    }

    if let Some(enabled) = input.verification_enabled {
        set_setting(conn, keys::VERIFICATION_ENABLED, &enabled.to_string())?;
    }

    if let Some(days) = input.retention_days {
        if days < 1 {
            return Err(AppError::BadRequest(format!(
                "Retention days must be at least 1, got {}",
                days
            )));
        }
        set_setting(conn, keys::RETENTION_DAYS, &days.to_string())?;
    }

    get_resolved_settings(conn)
}
