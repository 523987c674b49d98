//! Service healthcheck.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use super::state::AppState;

/// GET /v1/healthcheck
pub async fn healthcheck(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": &*state.environment,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
