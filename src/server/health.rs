//! `/health`, `/ready`, `/live` liveness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::server::state::AppState;

pub async fn health() -> Response {
    Json(json!({ "status": "healthy", "version": crate::VERSION })).into_response()
}

pub async fn live() -> Response {
    Json(json!({ "status": "alive", "version": crate::VERSION })).into_response()
}

/// Unlike `/health` and `/live`, `/ready` checks the database connection —
/// a pool that can't run a query means this instance shouldn't receive
/// traffic yet.
pub async fn ready(State(state): State<AppState>) -> Response {
    match state.repos.users.get_by_id("__readiness_probe__").await {
        Ok(_) => Json(json!({ "status": "ready", "version": crate::VERSION })).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "version": crate::VERSION, "error": e.to_string() })),
        )
            .into_response(),
    }
}
