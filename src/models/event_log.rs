use serde::{Deserialize, Serialize};

/// Append-only event log row (audit database).
///
/// Written through `events::EventSink`, never read on a request path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    pub id: String,
    pub timestamp: i64,
    pub event_type: String,
    pub subject_id: String,
    pub metadata: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
