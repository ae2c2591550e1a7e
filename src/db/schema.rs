use rusqlite::Connection;

/// Initialize the main database schema (everything except the event log).
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Receipts (one per successfully ingested payment)
        -- external_payment_id UNIQUE is the idempotency point for webhook redelivery
        CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            external_payment_id TEXT NOT NULL UNIQUE,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            source TEXT NOT NULL CHECK (source IN ('webhook', 'simulated')),
            confidence_score INTEGER,
            confidence_label TEXT CHECK (confidence_label IS NULL OR confidence_label IN ('HIGH', 'MEDIUM', 'LOW')),
            refunded INTEGER NOT NULL DEFAULT 0,
            demo_refunded INTEGER NOT NULL DEFAULT 0,
            demo_disputed INTEGER NOT NULL DEFAULT 0,
            demo_expired_qr INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_receipts_external ON receipts(external_payment_id);

        -- Receipt items (bulk-inserted at ingestion, immutable thereafter)
        CREATE TABLE IF NOT EXISTS receipt_items (
            id TEXT PRIMARY KEY,
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            unit_price REAL NOT NULL,
            quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 1),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_receipt_items_receipt ON receipt_items(receipt_id);

        -- Share tokens (capabilities granting read access to one receipt)
        CREATE TABLE IF NOT EXISTS share_tokens (
            id TEXT PRIMARY KEY,
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            token TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'verified', 'used', 'voided', 'expired')),
            single_use INTEGER NOT NULL DEFAULT 0,
            expires_at INTEGER,
            used_at INTEGER,
            verified_at INTEGER,
            verified_by TEXT,
            view_count INTEGER NOT NULL DEFAULT 0,
            verification_attempts INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_share_tokens_token ON share_tokens(token);
        CREATE INDEX IF NOT EXISTS idx_share_tokens_receipt ON share_tokens(receipt_id);

        -- Disputes (customer dispute submissions against one receipt)
        CREATE TABLE IF NOT EXISTS disputes (
            id TEXT PRIMARY KEY,
            receipt_id TEXT NOT NULL REFERENCES receipts(id) ON DELETE CASCADE,
            status TEXT NOT NULL DEFAULT 'submitted' CHECK (status IN ('submitted', 'in_review', 'resolved')),
            reason_code TEXT NOT NULL,
            notes TEXT,
            total_amount_cents INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_disputes_receipt ON disputes(receipt_id);
        CREATE INDEX IF NOT EXISTS idx_disputes_receipt_status ON disputes(receipt_id, status);

        -- Dispute items (selected receipt line items under dispute)
        CREATE TABLE IF NOT EXISTS dispute_items (
            id TEXT PRIMARY KEY,
            dispute_id TEXT NOT NULL REFERENCES disputes(id) ON DELETE CASCADE,
            receipt_item_id TEXT NOT NULL REFERENCES receipt_items(id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            amount_cents INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_dispute_items_dispute ON dispute_items(dispute_id);

        -- Administrative settings (key-value, read-through with defaults)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Initialize the event log database schema (separate DB file).
/// Optimized for append-only workload with WAL mode.
pub fn init_audit_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for append-only workloads
    // synchronous=NORMAL: safe with WAL, faster than FULL
    // journal_size_limit: prevent WAL from growing indefinitely
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        CREATE TABLE IF NOT EXISTS event_log (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            metadata TEXT,
            ip_address TEXT,
            user_agent TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_event_log_timestamp ON event_log(timestamp);
        CREATE INDEX IF NOT EXISTS idx_event_log_subject ON event_log(subject_id);
        CREATE INDEX IF NOT EXISTS idx_event_log_type_time ON event_log(event_type, timestamp DESC);
        "#,
    )?;
    Ok(())
}
