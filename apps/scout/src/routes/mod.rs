pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::sourcing::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Provider account and quota
        .route("/api/v1/accounts", get(handlers::handle_accounts))
        .route("/api/v1/quota", get(handlers::handle_quota))
        // Candidate pipeline
        .route("/api/v1/criteria/extract", post(handlers::handle_extract))
        .route("/api/v1/runs", post(handlers::handle_run))
        .route("/api/v1/runs/retrieve", post(handlers::handle_retrieve))
        .route("/api/v1/runs/score", post(handlers::handle_score))
        .route("/api/v1/push", post(handlers::handle_push))
        .with_state(state)
}
