// All LLM prompt templates for the candidate pipeline.
// Reuses cross-cutting fragments from llm_client::prompts.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("valid regex"))
}

/// Fills `{name}` placeholders in one pass. Inserted values are not rescanned,
/// so brief text containing `{profiles}` stays literal. Unknown names are kept.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    placeholder()
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}

/// Criteria extraction prompt template.
/// Replace: {role}, {job_description}, {transcript}, {region}, {seniority}, {json_only}
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"{role} From the brief below, extract structured search criteria.

JOB DESCRIPTION:
{job_description}

HIRING MANAGER BRIEF (TRANSCRIPT):
{transcript}

REGION: {region}
SENIORITY: {seniority}

Return a JSON object with this EXACT schema:
{
  "job_titles": {
    "include": ["title 1", "title 2"],
    "exclude": ["title to exclude"]
  },
  "companies": {
    "include": [],
    "exclude": ["company to exclude"]
  },
  "locations": {
    "countries": ["France"],
    "regions": ["region 1"]
  },
  "years_experience": {
    "min": 3,
    "max": 8
  },
  "boolean_query": "complete boolean search expression",
  "keywords": {
    "include": ["keyword 1", "keyword 2"],
    "exclude": ["keyword to exclude"]
  },
  "summary": "Two-line summary of the profile being searched for"
}

Rules:
- Job titles: include every essential variant in BOTH the brief's language and English.
- Regions: use the exact region name (e.g. Île-de-France, Auvergne-Rhône-Alpes).
- Keywords: single terms only (skills, tools, sectors), one per item, no boolean operators.
- years_experience: derive it from the stated seniority; min must not exceed max.

boolean_query must be a complete, valid, ready-to-use expression:
- Combine the essential title variants AND the key sector keywords
- Operators AND, OR, NOT always in UPPERCASE
- Always "AND NOT" for exclusions, never a bare "NOT"
- Quote every multi-word phrase (e.g. "sales director")
- Do NOT include locations (they are handled by a separate location filter)
- Stay under 800 characters; keep only discriminating terms
- Example: ("directeur commercial" OR "sales director") AND (insurance OR P&C) AND NOT (junior OR intern)
- boolean_query is a single-line STRING, never an array.

{json_only}"#;

/// Batch scoring prompt template.
/// Replace: {role}, {job_description}, {transcript}, {criteria_summary}, {region},
///          {exclusions}, {profiles}, {json_only}
pub const SCORING_PROMPT_TEMPLATE: &str = r#"{role} Score each profile from 0 to 10 against the brief.

JOB DESCRIPTION:
{job_description}

HIRING MANAGER BRIEF:
{transcript}

CRITERIA SUMMARY: {criteria_summary}
TARGET REGION: {region}
{exclusions}
PROFILES:
{profiles}

Return a JSON ARRAY with exactly one entry per profile above:
[
  {
    "profile_id": "the exact ID shown for the profile",
    "score": 7,
    "justification": "1-2 lines max"
  }
]

SCALE:
- 8-10: Excellent match (experience, skills, sector and education aligned)
- 6-7: Good match, minor gaps
- 4-5: Partial match
- 0-3: Weak match

Use ALL the data (skills, education, career path, summary). Be demanding and discriminating.
`score` is an integer from 0 to 10.

{json_only}"#;

/// Inserted into the scoring prompt when the run carries extra exclusion keywords.
/// Replace: {keywords}
pub const EXCLUSIONS_BLOCK_TEMPLATE: &str = "
ADDITIONAL EXCLUSION KEYWORDS: {keywords}
Any profile matching one of these keywords must be scored 2 or lower.
";
