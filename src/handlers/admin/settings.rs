use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::events::event_types;
use crate::extractors::Json;
use crate::models::{ResolvedSettings, UpdateSettings};

/// GET /admin/settings - stored values merged with defaults.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<ResolvedSettings>> {
    let conn = state.db.get()?;
    Ok(Json(queries::get_resolved_settings(&conn)?))
}

/// PUT /admin/settings - partial update, range-validated.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(input): Json<UpdateSettings>,
) -> Result<Json<ResolvedSettings>> {
    let conn = state.db.get()?;

    let resolved = queries::apply_settings_update(&conn, &input)?;

    state.events.record(
        event_types::SETTING_CHANGED,
        "settings",
        Some(&serde_json::json!({
            "confidence_threshold": input.confidence_threshold,
            "single_use_default": input.single_use_default,
            "verification_enabled": input.verification_enabled,
            "retention_days": input.retention_days,
        })),
    );

    Ok(Json(resolved))
}
