use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::provider::ProviderError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("LLM error: {0}")]
    Llm(String),

    /// Model output that is not valid JSON, misses keys, or is out of range.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Daily live-network quota reached ({used}/{limit} profiles used, 0 remaining). Try again tomorrow or use another source.")]
    QuotaExceeded { used: u32, limit: u32 },

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Maps an LLM failure to `Parse` when the model answered with unusable
/// content, and to `Llm` when the call itself failed.
pub fn llm_failure(context: &str, error: LlmError) -> AppError {
    match error {
        LlmError::Parse(_) | LlmError::EmptyContent => {
            AppError::Parse(format!("{context}: {error}"))
        }
        other => AppError::Llm(format!("{context}: {other}")),
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Provider(e) => match e {
                ProviderError::InvalidApiKey => (StatusCode::BAD_GATEWAY, "AUTH_ERROR"),
                ProviderError::InsufficientScope { .. } => {
                    (StatusCode::BAD_GATEWAY, "SCOPE_ERROR")
                }
                ProviderError::BillingRequired => (StatusCode::PAYMENT_REQUIRED, "BILLING_ERROR"),
                ProviderError::PlanUpgradeRequired => (StatusCode::PAYMENT_REQUIRED, "PLAN_ERROR"),
                ProviderError::Validation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "PROVIDER_VALIDATION_ERROR")
                }
                ProviderError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ProviderError::RateLimitExceeded { .. } => {
                    (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
                }
                ProviderError::Api { .. } | ProviderError::Http(_) => {
                    (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR")
                }
            },
            AppError::Llm(_) => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
            AppError::Parse(_) => (StatusCode::BAD_GATEWAY, "PARSE_ERROR"),
            AppError::QuotaExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                self.to_string()
            }
            AppError::Provider(e) => {
                tracing::warn!("Provider error: {e}");
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
