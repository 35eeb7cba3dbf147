use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and upstreams.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "scout-api",
        "model": llm_client::MODEL,
        "provider": state.config.sourcing_base_url,
    }))
}
