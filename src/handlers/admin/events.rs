use axum::extract::State;
use serde::Deserialize;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Query};
use crate::models::EventLog;

const DEFAULT_EVENT_LIMIT: i64 = 50;
const MAX_EVENT_LIMIT: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListEventsQuery {
    /// Restrict to events about one entity (receipt, token, dispute id)
    pub subject_id: Option<String>,
    pub limit: Option<i64>,
}

/// GET /admin/events - most recent audit events first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListEventsQuery>,
) -> Result<Json<Vec<EventLog>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT);

    let events = state.events.recent(params.subject_id.as_deref(), limit)?;
    Ok(Json(events))
}
