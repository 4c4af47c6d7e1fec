//! Health endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

/// Report liveness and the configured backend kind.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.config.backend.as_str(),
    }))
}
