//! Fire-and-forget event logging.
//!
//! The event sink records audit-style events parallel to the main logic.
//! Its own failures are logged and swallowed: event logging must never
//! appear in the return-value error path of the operation that emitted it.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::id::EntityType;

/// Event types recorded by the core operations.
pub mod event_types {
    pub const RECEIPT_INGESTED: &str = "receipt.ingested";
    pub const RECEIPT_REFUNDED: &str = "receipt.refunded";
    pub const SHARE_TOKEN_CREATED: &str = "share_token.created";
    pub const SHARE_TOKEN_REUSED: &str = "share_token.reused";
    pub const SHARE_TOKEN_VOIDED: &str = "share_token.voided";
    pub const VERIFICATION_ATTEMPT: &str = "verification.attempt";
    pub const DISPUTE_SUBMITTED: &str = "dispute.submitted";
    pub const DISPUTE_STATUS_CHANGED: &str = "dispute.status_changed";
    pub const SETTING_CHANGED: &str = "setting.changed";
}

/// Handle to the append-only event log database.
#[derive(Clone)]
pub struct EventSink {
    pool: Pool<SqliteConnectionManager>,
}

impl EventSink {
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Self {
        Self { pool }
    }

    /// Record an event. Failures are logged at warn level and swallowed.
    pub fn record(&self, event_type: &str, subject_id: &str, metadata: Option<&serde_json::Value>) {
        self.record_with_request(event_type, subject_id, metadata, None, None);
    }

    /// Record an event with the originating request's IP and user-agent.
    pub fn record_with_request(
        &self,
        event_type: &str,
        subject_id: &str,
        metadata: Option<&serde_json::Value>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) {
        if let Err(e) = self.try_record(event_type, subject_id, metadata, ip_address, user_agent) {
            tracing::warn!("Failed to record event {} for {}: {}", event_type, subject_id, e);
        }
    }

    fn try_record(
        &self,
        event_type: &str,
        subject_id: &str,
        metadata: Option<&serde_json::Value>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> crate::error::Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO event_log (id, timestamp, event_type, subject_id, metadata, ip_address, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                EntityType::EventLog.gen_id(),
                chrono::Utc::now().timestamp(),
                event_type,
                subject_id,
                metadata.map(|m| m.to_string()),
                ip_address,
                user_agent,
            ],
        )?;
        Ok(())
    }

    /// Most recent events, optionally filtered to one subject.
    pub fn recent(
        &self,
        subject_id: Option<&str>,
        limit: i64,
    ) -> crate::error::Result<Vec<crate::models::EventLog>> {
        use crate::db::from_row::{query_all, EVENT_LOG_COLS};

        let conn = self.pool.get()?;
        match subject_id {
            Some(subject) => query_all(
                &conn,
                &format!(
                    "SELECT {} FROM event_log WHERE subject_id = ?1
                     ORDER BY timestamp DESC, id LIMIT ?2",
                    EVENT_LOG_COLS
                ),
                &[&subject, &limit],
            ),
            None => query_all(
                &conn,
                &format!(
                    "SELECT {} FROM event_log ORDER BY timestamp DESC, id LIMIT ?1",
                    EVENT_LOG_COLS
                ),
                &[&limit],
            ),
        }
    }

    /// Delete event log rows older than `retention_days`. Returns rows purged.
    pub fn purge_older_than(&self, retention_days: i64) -> crate::error::Result<usize> {
        let conn = self.pool.get()?;
        let cutoff = chrono::Utc::now().timestamp() - retention_days * 86400;
        conn.execute("DELETE FROM event_log WHERE timestamp < ?1", params![cutoff])
            .map_err(Into::into)
    }
}
