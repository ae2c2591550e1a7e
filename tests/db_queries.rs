//! Store-level tests for behavior that doesn't surface cleanly over HTTP:
//! schema capability fallback and concurrency-shaped invariants.

mod common;

use common::*;

/// Recreate the disputes table as an older deployment would have it,
/// without the total_amount_cents column.
fn downgrade_disputes_table(conn: &rusqlite::Connection) {
    conn.execute_batch(
        "DROP TABLE dispute_items;
         DROP TABLE disputes;
         CREATE TABLE disputes (
             id TEXT PRIMARY KEY,
             receipt_id TEXT NOT NULL REFERENCES receipts(id),
             status TEXT NOT NULL DEFAULT 'submitted'
                 CHECK (status IN ('submitted', 'in_review', 'resolved')),
             reason_code TEXT NOT NULL,
             notes TEXT,
             created_at INTEGER NOT NULL,
             updated_at INTEGER NOT NULL
         );
         CREATE TABLE dispute_items (
             id TEXT PRIMARY KEY,
             dispute_id TEXT NOT NULL REFERENCES disputes(id),
             receipt_item_id TEXT NOT NULL REFERENCES receipt_items(id),
             quantity INTEGER NOT NULL,
             amount_cents INTEGER NOT NULL
         );",
    )
    .unwrap();
}

#[test]
fn test_dispute_insert_falls_back_on_legacy_schema() {
    let conn = setup_test_db();
    downgrade_disputes_table(&conn);

    let receipt = create_test_receipt(&conn, "pay_601", 12.0);
    let items = create_test_items(&conn, &receipt.id, &[("Widget", 6.0, 2)]);

    let (dispute, dispute_items) = queries::create_dispute(
        &conn,
        &receipt.id,
        &CreateDispute {
            selected_items: vec![DisputeItemSelection {
                receipt_item_id: items[0].id.clone(),
                quantity: Some(2),
            }],
            reason_code: "wrong_item".into(),
            notes: None,
        },
    )
    .unwrap();

    // The dispute lands without the aggregate; per-item amounts survive
    assert_eq!(dispute.total_amount_cents, None);
    assert_eq!(dispute_items[0].amount_cents, 1200);
}

#[test]
fn test_active_dispute_lookup_falls_back_on_legacy_schema() {
    let conn = setup_test_db();
    downgrade_disputes_table(&conn);

    let receipt = create_test_receipt(&conn, "pay_602", 12.0);
    let items = create_test_items(&conn, &receipt.id, &[("Widget", 6.0, 2)]);
    queries::create_dispute(
        &conn,
        &receipt.id,
        &CreateDispute {
            selected_items: vec![DisputeItemSelection {
                receipt_item_id: items[0].id.clone(),
                quantity: None,
            }],
            reason_code: "wrong_item".into(),
            notes: None,
        },
    )
    .unwrap();

    let active = queries::get_active_disputes(&conn, &receipt.id).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].total_amount_cents, None);
}

#[test]
fn test_duplicate_receipt_insert_returns_existing() {
    let conn = setup_test_db();

    let (first, created) =
        queries::create_receipt(&conn, "pay_603", 10.0, "usd", ReceiptSource::Webhook).unwrap();
    assert!(created);

    let (second, created) =
        queries::create_receipt(&conn, "pay_603", 99.0, "usd", ReceiptSource::Webhook).unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    // The stored amount is the original's, not the redelivery's
    assert_eq!(second.amount, 10.0);
}

#[test]
fn test_single_use_flag_is_fixed_at_creation() {
    let conn = setup_test_db();
    let receipt = create_test_receipt(&conn, "pay_604", 10.0);

    let share = create_test_share_token_with(
        &conn,
        &receipt.id,
        &CreateShareToken {
            expires_at: None,
            single_use: Some(true),
            reuse_existing: false,
        },
    );
    assert!(share.single_use);

    // Flipping the configured default later does not touch existing tokens
    queries::apply_settings_update(
        &conn,
        &UpdateSettings {
            single_use_default: Some(false),
            ..Default::default()
        },
    )
    .unwrap();

    let reread = queries::get_share_token_by_token(&conn, &share.token)
        .unwrap()
        .unwrap();
    assert!(reread.single_use);
}

#[test]
fn test_event_log_purge_respects_retention() {
    let manager = r2d2_sqlite::SqliteConnectionManager::memory();
    let pool = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_audit_db(&conn).unwrap();
        // One fresh event, one well past any retention window
        conn.execute(
            "INSERT INTO event_log (id, timestamp, event_type, subject_id)
             VALUES ('vt_evt_old', ?1, 'verification.attempt', 'vt_shr_x'),
                    ('vt_evt_new', ?2, 'verification.attempt', 'vt_shr_x')",
            rusqlite::params![past_timestamp(400), chrono::Utc::now().timestamp()],
        )
        .unwrap();
    }

    let sink = EventSink::new(pool.clone());
    let purged = sink.purge_older_than(365).unwrap();
    assert_eq!(purged, 1);

    let conn = pool.get().unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM event_log", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 1);
}
