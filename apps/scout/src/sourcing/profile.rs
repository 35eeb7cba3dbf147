//! Candidate profiles normalized across every source type, and their scores.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::provider::models::{string_or_number, RawProfile, SourceType};

/// Which backend a profile was retrieved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSource {
    Scraped,
    LiveNetwork,
    Crm,
}

impl From<SourceType> for ProfileSource {
    fn from(source: SourceType) -> Self {
        match source {
            SourceType::ScrapedDatabase => ProfileSource::Scraped,
            SourceType::LiveNetwork => ProfileSource::LiveNetwork,
            SourceType::Crm => ProfileSource::Crm,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    #[serde(default, deserialize_with = "null_as_default")]
    pub diploma: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specialization: String,
    #[serde(
        rename = "educational_establishment",
        default,
        deserialize_with = "null_as_default"
    )]
    pub institution: String,
}

/// A single candidate record. `profile_id` is unique within one retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub profile_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub total_years_experience: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub current_job: Option<serde_json::Value>,
    pub source: ProfileSource,
}

impl Profile {
    /// Normalizes a provider record. Records without a profile id are unusable
    /// downstream (scores are keyed by it) and yield `None`.
    pub fn from_raw(raw: RawProfile, source: ProfileSource) -> Option<Self> {
        let profile_id = raw.profile_id.map(|id| id.trim().to_string())?;
        if profile_id.is_empty() {
            return None;
        }

        Some(Profile {
            profile_id,
            first_name: raw.first_name.unwrap_or_default(),
            last_name: raw.last_name.unwrap_or_default(),
            headline: raw.headline.unwrap_or_default(),
            location: raw.location.unwrap_or_default(),
            linkedin_url: non_blank(raw.linkedin_url),
            total_years_experience: raw.total_years_experience,
            skills: raw.skills.unwrap_or_default(),
            experiences: raw.experiences.unwrap_or_default(),
            educations: raw.educations.unwrap_or_default(),
            summary: non_blank(raw.summary),
            picture_url: non_blank(raw.picture_url),
            current_job: raw.current_job.filter(|v| !v.is_null()),
            source,
        })
    }

    /// Lowercased, trimmed `"first last"`; `None` when both parts are blank.
    pub fn normalized_name(&self) -> Option<String> {
        normalized_full_name(&self.first_name, &self.last_name)
    }

    /// The LinkedIn URL used as the primary identity key, if non-empty.
    pub fn identity_url(&self) -> Option<&str> {
        self.linkedin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Normalizes a page of provider records, dropping and logging those without an id.
pub fn normalize_page(raws: Vec<RawProfile>, source: ProfileSource) -> Vec<Profile> {
    let total = raws.len();
    let profiles: Vec<Profile> = raws
        .into_iter()
        .filter_map(|raw| Profile::from_raw(raw, source))
        .collect();

    if profiles.len() < total {
        warn!(
            dropped = total - profiles.len(),
            "Dropped provider profiles without a profile_id"
        );
    }
    profiles
}

pub(crate) fn normalized_full_name(first: &str, last: &str) -> Option<String> {
    let name = format!(
        "{} {}",
        first.to_lowercase().trim(),
        last.to_lowercase().trim()
    );
    if name.trim().is_empty() {
        None
    } else {
        Some(name)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The model's verdict for one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    #[serde(deserialize_with = "string_or_number")]
    pub profile_id: String,
    pub score: u8,
    pub justification: String,
}

/// A profile merged with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProfile {
    #[serde(flatten)]
    pub profile: Profile,
    pub score: u8,
    pub justification: String,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
