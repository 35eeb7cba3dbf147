//! Criteria Extractor: turns a free-text brief into structured search criteria
//! with a single LLM call.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{llm_failure, AppError};
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, RECRUITER_ROLE};
use crate::llm_client::{complete_json, LanguageModel};
use crate::sourcing::prompts::{fill_template, EXTRACTION_PROMPT_TEMPLATE};

/// Output token budget of the extraction call.
pub const EXTRACTION_MAX_TOKENS: u32 = 1500;

/// The brief handed to the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Brief {
    pub job_description: String,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub seniority: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermLists {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Locations {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearsExperience {
    pub min: u32,
    pub max: u32,
}

impl YearsExperience {
    pub fn is_unbounded(&self) -> bool {
        self.min == 0 && self.max == 0
    }
}

/// Structured search criteria. Extracted once per brief, editable by the user,
/// fixed once a search starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub job_titles: TermLists,
    /// Only `exclude` is used by searches; `include` is kept for the wire shape.
    #[serde(default)]
    pub companies: TermLists,
    pub locations: Locations,
    pub years_experience: YearsExperience,
    pub keywords: TermLists,
    #[serde(default)]
    pub boolean_query: Option<String>,
    pub summary: String,
}

impl SearchCriteria {
    /// Trims every list, drops blanks and duplicates, and empties a blank boolean query.
    pub fn normalized(self) -> Self {
        let clean_terms = |t: TermLists| TermLists {
            include: clean_list(t.include),
            exclude: clean_list(t.exclude),
        };

        SearchCriteria {
            job_titles: clean_terms(self.job_titles),
            companies: clean_terms(self.companies),
            locations: Locations {
                countries: clean_list(self.locations.countries),
                regions: clean_list(self.locations.regions),
            },
            years_experience: self.years_experience,
            keywords: clean_terms(self.keywords),
            boolean_query: self
                .boolean_query
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            summary: self.summary.trim().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let years = self.years_experience;
        if years.min > years.max {
            return Err(format!(
                "years_experience.min ({}) exceeds years_experience.max ({})",
                years.min, years.max
            ));
        }
        Ok(())
    }

    /// Merges a run's extra exclusion keywords into `keywords.exclude`.
    pub fn with_exclusions(mut self, extra: &[String]) -> Self {
        let mut merged = std::mem::take(&mut self.keywords.exclude);
        merged.extend(extra.iter().cloned());
        self.keywords.exclude = clean_list(merged);
        self
    }
}

/// Trims items, drops blanks, and removes duplicates keeping the first occurrence.
pub fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}

/// Extracts search criteria from a brief. Any parse failure or missing key is
/// returned as-is; the caller re-invokes with adjusted input.
pub async fn extract_criteria(
    brief: &Brief,
    llm: &dyn LanguageModel,
) -> Result<SearchCriteria, AppError> {
    let prompt = fill_template(
        EXTRACTION_PROMPT_TEMPLATE,
        &[
            ("role", RECRUITER_ROLE),
            ("json_only", JSON_ONLY_INSTRUCTION),
            ("transcript", brief.transcript.as_str()),
            ("region", brief.region.as_str()),
            ("seniority", brief.seniority.as_str()),
            ("job_description", brief.job_description.as_str()),
        ],
    );

    let criteria = complete_json::<SearchCriteria>(llm, &prompt, EXTRACTION_MAX_TOKENS)
        .await
        .map_err(|e| llm_failure("Criteria extraction failed", e))?
        .normalized();

    criteria
        .validate()
        .map_err(|e| AppError::Parse(format!("Criteria extraction failed: {e}")))?;

    info!(
        titles = criteria.job_titles.include.len(),
        keywords = criteria.keywords.include.len(),
        regions = criteria.locations.regions.len(),
        "Search criteria extracted"
    );
    Ok(criteria)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedModel;

    const MODEL_OUTPUT: &str = r#"```json
{
  "job_titles": {"include": ["Analyste financier", "Financial Analyst", " Financial Analyst "], "exclude": ["Stagiaire"]},
  "companies": {"include": [], "exclude": ["Big Four"]},
  "locations": {"countries": ["France"], "regions": ["Île-de-France", ""]},
  "years_experience": {"min": 2, "max": 5},
  "boolean_query": "(\"financial analyst\" OR \"analyste financier\") AND NOT (stagiaire)",
  "keywords": {"include": ["FP&A", "IFRS"], "exclude": []},
  "summary": "Financial analyst with 2-5 years in corporate finance."
}
```"#;

    fn brief() -> Brief {
        Brief {
            job_description: "Financial analyst for a CAC40 group".to_string(),
            transcript: "Needs strong FP&A background".to_string(),
            region: "Île-de-France".to_string(),
            seniority: "2-5 years".to_string(),
        }
    }

    #[tokio::test]
    async fn test_extract_criteria_parses_fenced_output() {
        let model = ScriptedModel::new([MODEL_OUTPUT]);
        let criteria = extract_criteria(&brief(), &model).await.unwrap();

        assert_eq!(
            criteria.job_titles.include,
            vec!["Analyste financier", "Financial Analyst"]
        );
        assert_eq!(criteria.locations.regions, vec!["Île-de-France"]);
        assert_eq!(criteria.years_experience, YearsExperience { min: 2, max: 5 });
        assert_eq!(criteria.companies.exclude, vec!["Big Four"]);
        assert!(criteria.boolean_query.unwrap().contains("AND NOT"));
    }

    #[tokio::test]
    async fn test_extract_criteria_prompt_carries_brief_and_budget() {
        let model = ScriptedModel::new([MODEL_OUTPUT]);
        extract_criteria(&brief(), &model).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        let (prompt, max_tokens) = &prompts[0];
        assert_eq!(*max_tokens, EXTRACTION_MAX_TOKENS);
        assert!(prompt.contains("Financial analyst for a CAC40 group"));
        assert!(prompt.contains("SENIORITY: 2-5 years"));
        assert!(prompt.contains("800 characters"));
        assert!(!prompt.contains("{json_only}"));
    }

    #[tokio::test]
    async fn test_extract_criteria_keeps_placeholders_in_transcript() {
        let model = ScriptedModel::new([MODEL_OUTPUT]);
        let mut brief = brief();
        brief.transcript = "Paste of {job_description}".to_string();
        extract_criteria(&brief, &model).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        let prompt = &prompts[0].0;
        assert!(prompt.contains("Paste of {job_description}"));
        assert_eq!(prompt.matches("Financial analyst for a CAC40 group").count(), 1);
    }

    #[tokio::test]
    async fn test_extract_criteria_missing_key_is_parse_error() {
        let model = ScriptedModel::new([r#"{"job_titles": {"include": []}, "summary": "x"}"#]);
        let err = extract_criteria(&brief(), &model).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_extract_criteria_prose_is_parse_error() {
        let model = ScriptedModel::new(["I could not find enough information."]);
        let err = extract_criteria(&brief(), &model).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(model.prompt_count(), 1, "extraction must not retry");
    }

    #[tokio::test]
    async fn test_extract_criteria_inverted_years_is_parse_error() {
        let output = MODEL_OUTPUT.replace(r#""min": 2, "max": 5"#, r#""min": 8, "max": 5"#);
        let model = ScriptedModel::new([output]);
        let err = extract_criteria(&brief(), &model).await.unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_blank_boolean_query_becomes_none() {
        let criteria = SearchCriteria {
            boolean_query: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(criteria.boolean_query, None);
    }

    #[test]
    fn test_with_exclusions_merges_and_dedups() {
        let criteria = SearchCriteria {
            keywords: TermLists {
                include: vec![],
                exclude: vec!["audit".to_string()],
            },
            ..Default::default()
        }
        .with_exclusions(&["conseil".to_string(), "audit".to_string(), " ".to_string()]);
        assert_eq!(criteria.keywords.exclude, vec!["audit", "conseil"]);
    }

    #[test]
    fn test_clean_list_keeps_first_seen_order() {
        let cleaned = clean_list(vec![
            " b ".to_string(),
            "a".to_string(),
            "b".to_string(),
            "".to_string(),
        ]);
        assert_eq!(cleaned, vec!["b", "a"]);
    }
}
