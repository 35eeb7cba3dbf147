//! Candidate pipeline orchestration.
//!
//! retrieve → deduplicate → exclude existing → location filter → score → rank.
//! Phases run strictly in sequence; every page and batch is awaited before the
//! next one starts.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::governor::QuotaGovernor;
use crate::llm_client::LanguageModel;
use crate::provider::{list_all_project_entries, SourcingApi};
use crate::sourcing::adapters::{self, SourceAdapter};
use crate::sourcing::boolean_query::{advise_length, sanitize_boolean_query, QueryLengthAdvice};
use crate::sourcing::criteria::{Brief, SearchCriteria};
use crate::sourcing::filtering::{deduplicate, exclude_existing, filter_by_location};
use crate::sourcing::profile::{Profile, ScoredProfile};
use crate::sourcing::ranking::{self, group_by_band, BandGroup, DEFAULT_SCORE_FLOOR};
use crate::sourcing::scorer::{score_profiles, ScoringContext};

// ────────────────────────────────────────────────────────────────────────────
// Requests
// ────────────────────────────────────────────────────────────────────────────

fn default_floor() -> u8 {
    DEFAULT_SCORE_FLOOR
}

/// Everything a run needs. Criteria are the user-reviewed output of extraction.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub project_id: String,
    pub source: SourceAdapter,
    pub criteria: SearchCriteria,
    pub max_profiles: u32,
    #[serde(default = "default_floor")]
    pub display_floor: u8,
    #[serde(default)]
    pub additional_exclusions: Vec<String>,
    pub brief: Brief,
}

/// Re-scores an already filtered candidate set, e.g. after a scoring failure.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub candidates: Vec<Profile>,
    pub brief: Brief,
    #[serde(default)]
    pub criteria_summary: String,
    #[serde(default)]
    pub additional_exclusions: Vec<String>,
    #[serde(default = "default_floor")]
    pub display_floor: u8,
}

impl ScoreRequest {
    fn context(&self) -> ScoringContext {
        ScoringContext {
            job_description: self.brief.job_description.clone(),
            transcript: self.brief.transcript.clone(),
            criteria_summary: self.criteria_summary.clone(),
            region: self.brief.region.clone(),
            exclusions: self.additional_exclusions.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalCounts {
    pub pages: u32,
    pub total_available: Option<u32>,
    pub fetched: usize,
    pub duplicates_removed: usize,
    pub existing_skipped: usize,
    pub location_excluded: usize,
    pub candidates: usize,
}

/// Filtered profiles ready for scoring.
#[derive(Debug, Serialize)]
pub struct CandidateSet {
    pub run_id: Uuid,
    pub counts: RetrievalCounts,
    pub query_advice: QueryLengthAdvice,
    pub warnings: Vec<String>,
    pub candidates: Vec<Profile>,
}

#[derive(Debug, Serialize)]
pub struct RankedResults {
    pub display_floor: u8,
    pub scored: usize,
    pub visible: usize,
    pub hidden: usize,
    pub bands: Vec<BandGroup>,
    /// Every scored profile, best first. The display floor only affects
    /// `visible`, `hidden` and `bands`.
    pub ranked: Vec<ScoredProfile>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub counts: RetrievalCounts,
    pub query_advice: QueryLengthAdvice,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<RankedResults>,
    /// Set when scoring failed. The filtered candidates are returned instead
    /// so that scoring alone can be retried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Profile>,
}

// ────────────────────────────────────────────────────────────────────────────
// Phases
// ────────────────────────────────────────────────────────────────────────────

fn validate(request: &RunRequest) -> Result<(), AppError> {
    if request.project_id.trim().is_empty() {
        return Err(AppError::Validation("project_id cannot be empty".to_string()));
    }
    if let SourceAdapter::LiveNetwork { account_id } = &request.source {
        if account_id.trim().is_empty() {
            return Err(AppError::Validation(
                "account_id is required for the live network source".to_string(),
            ));
        }
    }

    let range = request.source.max_profiles_range();
    if !range.contains(&request.max_profiles) {
        return Err(AppError::Validation(format!(
            "max_profiles must be between {} and {} for this source, got {}",
            range.start(),
            range.end(),
            request.max_profiles
        )));
    }
    if request.display_floor > 10 {
        return Err(AppError::Validation(
            "display_floor must be between 0 and 10".to_string(),
        ));
    }

    request.criteria.validate().map_err(AppError::Validation)
}

/// Retrieval and local filtering. Fails before any provider call on invalid input.
pub async fn retrieve_candidates(
    request: &RunRequest,
    api: &dyn SourcingApi,
    quota: &QuotaGovernor,
) -> Result<CandidateSet, AppError> {
    validate(request)?;
    let run_id = Uuid::new_v4();
    let criteria = request
        .criteria
        .clone()
        .normalized()
        .with_exclusions(&request.additional_exclusions);
    let query_advice = query_advice(&criteria);

    info!(
        %run_id,
        source = ?request.source.source_type(),
        project_id = %request.project_id,
        max_profiles = request.max_profiles,
        "Starting retrieval"
    );

    let retrieval = adapters::retrieve(
        &request.source,
        api,
        quota,
        &request.project_id,
        &criteria,
        request.max_profiles,
    )
    .await?;

    let mut warnings = retrieval.warnings;
    let mut counts = RetrievalCounts {
        pages: retrieval.pages,
        total_available: retrieval.total_available,
        fetched: retrieval.profiles.len(),
        existing_skipped: retrieval.already_in_project,
        ..Default::default()
    };

    let unique = deduplicate(retrieval.profiles);
    counts.duplicates_removed = counts.fetched - unique.len();

    let mut candidates = match list_all_project_entries(api, &request.project_id).await {
        Ok(existing) => {
            let exclusion = exclude_existing(unique, &existing);
            counts.existing_skipped += exclusion.skipped;
            exclusion.kept
        }
        Err(e) => {
            warn!(%run_id, error = %e, "Could not load existing project entries");
            warnings.push(format!(
                "Existing project entries could not be checked: {e}"
            ));
            unique
        }
    };

    let region = request.brief.region.trim();
    if request.source.applies_location_filter() && !region.is_empty() {
        let filtered = filter_by_location(candidates, region);
        counts.location_excluded = filtered.excluded.len();
        candidates = filtered.kept;
    }
    counts.candidates = candidates.len();

    info!(
        %run_id,
        fetched = counts.fetched,
        duplicates = counts.duplicates_removed,
        existing = counts.existing_skipped,
        location_excluded = counts.location_excluded,
        candidates = counts.candidates,
        "Candidates filtered"
    );

    Ok(CandidateSet {
        run_id,
        counts,
        query_advice,
        warnings,
        candidates,
    })
}

/// Scores, merges and ranks `candidates`.
pub async fn score_candidates(
    candidates: Vec<Profile>,
    context: &ScoringContext,
    display_floor: u8,
    llm: &dyn LanguageModel,
) -> Result<RankedResults, AppError> {
    let scores = score_profiles(&candidates, context, llm).await?;
    let ranked = ranking::rank(ranking::merge_scores(candidates, scores));
    let visible = ranking::at_or_above(&ranked, display_floor);

    Ok(RankedResults {
        display_floor,
        scored: ranked.len(),
        visible: visible.len(),
        hidden: ranked.len() - visible.len(),
        bands: group_by_band(&visible),
        ranked,
    })
}

pub async fn rescore(request: ScoreRequest, llm: &dyn LanguageModel) -> Result<RankedResults, AppError> {
    if request.display_floor > 10 {
        return Err(AppError::Validation(
            "display_floor must be between 0 and 10".to_string(),
        ));
    }
    let context = request.context();
    score_candidates(request.candidates, &context, request.display_floor, llm).await
}

/// Full run. Retrieval failures propagate; a scoring failure is reported in
/// the run report alongside the filtered candidates.
pub async fn run(
    request: &RunRequest,
    api: &dyn SourcingApi,
    quota: &QuotaGovernor,
    llm: &dyn LanguageModel,
) -> Result<RunReport, AppError> {
    let set = retrieve_candidates(request, api, quota).await?;
    let mut report = RunReport {
        run_id: set.run_id,
        counts: set.counts,
        query_advice: set.query_advice,
        warnings: set.warnings,
        results: None,
        scoring_error: None,
        candidates: Vec::new(),
    };

    if set.candidates.is_empty() {
        report
            .warnings
            .push("No candidates left after filtering; broaden the criteria.".to_string());
        return Ok(report);
    }

    let context = ScoringContext {
        job_description: request.brief.job_description.clone(),
        transcript: request.brief.transcript.clone(),
        criteria_summary: request.criteria.summary.clone(),
        region: request.brief.region.clone(),
        exclusions: request.additional_exclusions.clone(),
    };

    match score_candidates(set.candidates.clone(), &context, request.display_floor, llm).await {
        Ok(results) => {
            info!(
                run_id = %report.run_id,
                scored = results.scored,
                visible = results.visible,
                "Run complete"
            );
            report.results = Some(results);
        }
        Err(e @ (AppError::Parse(_) | AppError::Llm(_))) => {
            warn!(run_id = %report.run_id, error = %e, "Scoring failed, returning unscored candidates");
            report.scoring_error = Some(e.to_string());
            report.candidates = set.candidates;
        }
        Err(e) => return Err(e),
    }

    Ok(report)
}

fn query_advice(criteria: &SearchCriteria) -> QueryLengthAdvice {
    advise_length(&sanitize_boolean_query(
        criteria.boolean_query.as_deref().unwrap_or_default(),
    ))
}
