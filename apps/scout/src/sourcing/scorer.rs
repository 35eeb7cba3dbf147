//! Batch Scorer: scores filtered profiles against the brief, ten per LLM call.
//!
//! A batch whose response does not decode aborts the whole scoring phase:
//! scores for an unknown subset would skew the ranked output.

use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::{llm_failure, AppError};
use crate::governor;
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, RECRUITER_ROLE};
use crate::llm_client::{complete_json, LanguageModel};
use crate::sourcing::profile::{Profile, ScoreResult};
use crate::sourcing::prompts::{
    fill_template, EXCLUSIONS_BLOCK_TEMPLATE, SCORING_PROMPT_TEMPLATE,
};

pub const SCORING_BATCH_SIZE: usize = 10;
pub const SCORING_MAX_TOKENS: u32 = 4000;

pub const MAX_SCORE: u8 = 10;

const PROMPT_EXPERIENCES: usize = 4;
const PROMPT_EDUCATIONS: usize = 2;
const PROMPT_SKILLS: usize = 10;
const PROMPT_SUMMARY_CHARS: usize = 200;
const NOT_AVAILABLE: &str = "N/A";

/// Brief context shared by every scoring batch of a run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringContext {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub criteria_summary: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Scores `profiles` in order, one LLM call per batch of ten. Returns every
/// result the model produced; merging and defaults happen in the ranker.
pub async fn score_profiles(
    profiles: &[Profile],
    context: &ScoringContext,
    llm: &dyn LanguageModel,
) -> Result<Vec<ScoreResult>, AppError> {
    let batches = profiles.len().div_ceil(SCORING_BATCH_SIZE);
    let mut results = Vec::with_capacity(profiles.len());

    for (index, batch) in profiles.chunks(SCORING_BATCH_SIZE).enumerate() {
        let prompt = build_scoring_prompt(batch, context);
        let scores = complete_json::<Vec<ScoreResult>>(llm, &prompt, SCORING_MAX_TOKENS)
            .await
            .map_err(|e| llm_failure(&format!("Scoring batch {} failed", index + 1), e))?;

        if let Some(bad) = scores.iter().find(|s| s.score > MAX_SCORE) {
            return Err(AppError::Parse(format!(
                "Scoring batch {} failed: score {} for profile {} is outside 0-{MAX_SCORE}",
                index + 1,
                bad.score,
                bad.profile_id
            )));
        }

        debug!(batch = index + 1, batches, returned = scores.len(), "Scored batch");
        results.extend(scores);

        if index + 1 < batches {
            tokio::time::sleep(governor::SCORING_BATCH_DELAY).await;
        }
    }

    info!(profiles = profiles.len(), batches, scores = results.len(), "Scoring complete");
    Ok(results)
}

pub fn build_scoring_prompt(batch: &[Profile], context: &ScoringContext) -> String {
    let profiles: String = batch
        .iter()
        .enumerate()
        .map(|(i, p)| format_profile(i + 1, p))
        .collect();

    let exclusions = if context.exclusions.is_empty() {
        String::new()
    } else {
        fill_template(
            EXCLUSIONS_BLOCK_TEMPLATE,
            &[("keywords", context.exclusions.join(", ").as_str())],
        )
    };

    fill_template(
        SCORING_PROMPT_TEMPLATE,
        &[
            ("role", RECRUITER_ROLE),
            ("json_only", JSON_ONLY_INSTRUCTION),
            ("criteria_summary", context.criteria_summary.as_str()),
            ("region", context.region.as_str()),
            ("exclusions", exclusions.as_str()),
            ("transcript", context.transcript.as_str()),
            ("job_description", context.job_description.as_str()),
            ("profiles", profiles.as_str()),
        ],
    )
}

fn format_profile(position: usize, p: &Profile) -> String {
    let years = p
        .total_years_experience
        .map_or_else(|| NOT_AVAILABLE.to_string(), |y| y.to_string());
    let summary: String = p
        .summary
        .as_deref()
        .unwrap_or(NOT_AVAILABLE)
        .chars()
        .take(PROMPT_SUMMARY_CHARS)
        .collect();
    let skills = if p.skills.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        p.skills
            .iter()
            .take(PROMPT_SKILLS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let experiences: String = p
        .experiences
        .iter()
        .take(PROMPT_EXPERIENCES)
        .map(|exp| {
            let current = if exp.is_current { " (current)" } else { "" };
            let period = exp.start_date.as_deref().map_or(String::new(), |start| {
                format!(
                    " [{start} → {}]",
                    exp.end_date.as_deref().unwrap_or("present")
                )
            });
            format!("  - {} @ {}{current}{period}\n", exp.title, exp.company_name)
        })
        .collect();

    let education: String = p
        .educations
        .iter()
        .take(PROMPT_EDUCATIONS)
        .map(|edu| {
            format!(
                "  - {} {} @ {}\n",
                edu.diploma, edu.specialization, edu.institution
            )
        })
        .collect();

    format!(
        "
--- PROFILE {position} (ID: {id}) ---
Name: {name}
Headline: {headline}
Location: {location}
Years of experience: {years}
Summary: {summary}
Skills: {skills}
Experience:
{experiences}Education:
{education}",
        id = p.profile_id,
        name = p.display_name(),
        headline = p.headline,
        location = p.location,
    )
}
