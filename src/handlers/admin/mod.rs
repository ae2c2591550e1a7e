mod demo;
mod disputes;
mod events;
mod settings;
mod share;

pub use demo::*;
pub use disputes::*;
pub use events::*;
pub use settings::*;
pub use share::*;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::db::AppState;

/// Console surface. Authentication of this surface is a deployment concern
/// (fronted by the operator's own proxy/auth), not handled here.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/receipts/{receipt_id}/share", post(create_share_token))
        .route("/admin/tokens/{token}/void", post(void_token))
        .route("/admin/receipts/{receipt_id}/disputes", post(create_dispute))
        .route("/admin/disputes/{dispute_id}/status", put(update_dispute_status))
        .route("/admin/settings", get(get_settings).put(update_settings))
        .route("/admin/events", get(list_events))
        .route("/admin/demo/receipts", post(create_demo_receipt))
        .route(
            "/admin/demo/receipts/{receipt_id}/overrides",
            put(update_demo_overrides),
        )
}
