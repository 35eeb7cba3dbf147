//! Axum route handlers for the Sourcing API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::governor::QuotaStatus;
use crate::provider::models::ConnectedAccount;
use crate::sourcing::boolean_query::{advise_length, sanitize_boolean_query, QueryLengthAdvice};
use crate::sourcing::criteria::{extract_criteria, Brief, SearchCriteria};
use crate::sourcing::pipeline::{
    self, CandidateSet, RankedResults, RunReport, RunRequest, ScoreRequest,
};
use crate::sourcing::profile::ScoredProfile;
use crate::sourcing::push::{push_profiles, PushReport};
use crate::sourcing::ranking::DEFAULT_SCORE_FLOOR;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub criteria: SearchCriteria,
    pub query_advice: QueryLengthAdvice,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<ConnectedAccount>,
}

fn default_push_floor() -> u8 {
    DEFAULT_SCORE_FLOOR
}

#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub project_id: String,
    pub profiles: Vec<ScoredProfile>,
    #[serde(default = "default_push_floor")]
    pub push_floor: u8,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/accounts
///
/// Connected live-network accounts; one of them is required for live-network runs.
pub async fn handle_accounts(
    State(state): State<AppState>,
) -> Result<Json<AccountsResponse>, AppError> {
    let accounts = state.provider.connected_accounts().await?;
    Ok(Json(AccountsResponse { accounts }))
}

/// GET /api/v1/quota
pub async fn handle_quota(State(state): State<AppState>) -> Json<QuotaStatus> {
    Json(state.quota.status())
}

/// POST /api/v1/criteria/extract
///
/// Extracts search criteria from a brief. The client reviews and edits them
/// before starting a run.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(brief): Json<Brief>,
) -> Result<Json<ExtractResponse>, AppError> {
    if brief.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let criteria = extract_criteria(&brief, state.llm.as_ref()).await?;
    let query_advice = advise_length(&sanitize_boolean_query(
        criteria.boolean_query.as_deref().unwrap_or_default(),
    ));

    Ok(Json(ExtractResponse {
        criteria,
        query_advice,
    }))
}

/// POST /api/v1/runs
///
/// Retrieval, filtering, scoring and ranking in one call.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunReport>, AppError> {
    let report = pipeline::run(
        &request,
        state.provider.as_ref(),
        &state.quota,
        state.llm.as_ref(),
    )
    .await?;
    Ok(Json(report))
}

/// POST /api/v1/runs/retrieve
///
/// Retrieval and filtering only; returns the candidates to score.
pub async fn handle_retrieve(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<CandidateSet>, AppError> {
    let set =
        pipeline::retrieve_candidates(&request, state.provider.as_ref(), &state.quota).await?;
    Ok(Json(set))
}

/// POST /api/v1/runs/score
///
/// Scores and ranks a candidate set returned by a previous retrieval.
pub async fn handle_score(
    State(state): State<AppState>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<RankedResults>, AppError> {
    let results = pipeline::rescore(request, state.llm.as_ref()).await?;
    Ok(Json(results))
}

/// POST /api/v1/push
///
/// Writes ranked profiles at or above `push_floor` into the project.
pub async fn handle_push(
    State(state): State<AppState>,
    Json(request): Json<PushRequest>,
) -> Result<Json<PushReport>, AppError> {
    if request.project_id.trim().is_empty() {
        return Err(AppError::Validation("project_id cannot be empty".to_string()));
    }
    if request.push_floor > 10 {
        return Err(AppError::Validation(
            "push_floor must be between 0 and 10".to_string(),
        ));
    }

    let report = push_profiles(
        state.provider.as_ref(),
        &request.project_id,
        &request.profiles,
        request.push_floor,
    )
    .await?;
    Ok(Json(report))
}
