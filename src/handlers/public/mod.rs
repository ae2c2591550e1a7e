mod resolution;
mod resolve;
mod verify;

pub use resolution::*;
pub use resolve::*;
pub use verify::*;

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // GET is the customer-facing link target; both endpoints resolve
        // the same way, POST additionally records the merchant verification
        .route("/verify/{token}", get(resolve_by_token).post(verify_by_token))
}
