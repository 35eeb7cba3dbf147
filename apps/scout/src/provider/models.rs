//! Wire shapes of the sourcing provider's REST API.

use serde::{Deserialize, Deserializer, Serialize};

use crate::sourcing::criteria::YearsExperience;
use crate::sourcing::profile::{Education, Experience};

/// Every provider response wraps its payload in `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Paginated list responses add `{"meta": {"has_more": bool}}`.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: ListMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub has_more: bool,
}

/// A live-network seat connected to the provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedAccount {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub license_type: Option<String>,
    #[serde(default)]
    pub api_status: Option<serde_json::Value>,
}

/// One result of a free-text location lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationMatch {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
}

/// Source discriminator understood by the generic sourcing search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "leonar_source")]
    ScrapedDatabase,
    #[serde(rename = "linkedin")]
    LiveNetwork,
    #[serde(rename = "contacts")]
    Crm,
}

/// A candidate as returned by any search endpoint, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub total_years_experience: Option<f64>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub experiences: Option<Vec<Experience>>,
    #[serde(default)]
    pub educations: Option<Vec<Education>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub current_job: Option<serde_json::Value>,
    #[serde(default)]
    pub already_in_project: bool,
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub profiles: Vec<RawProfile>,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub filters_too_strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncludeExclude {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl IncludeExclude {
    /// `None` when both sides are empty, so the key is left out of the payload.
    pub fn non_empty(include: &[String], exclude: &[String]) -> Option<Self> {
        if include.is_empty() && exclude.is_empty() {
            return None;
        }
        Some(Self {
            include: include.to_vec(),
            exclude: exclude.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationFilter {
    pub countries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyFilter {
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactsFilter {
    pub contact_types: Vec<String>,
}

/// Filter object of the generic sourcing search (scraped database and CRM).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_titles: Option<IncludeExclude>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<IncludeExclude>,
    pub locations: LocationFilter,
    pub years_experience: YearsExperience,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companies: Option<CompanyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts_filters: Option<ContactsFilter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcingSearchRequest {
    pub project_id: String,
    pub source_type: SourceType,
    pub filters: SearchFilters,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSearchRequest {
    pub project_id: String,
    pub account_id: String,
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub job_titles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub location_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<YearsExperience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boolean_query: Option<String>,
}

/// An entry already present in a project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub contact: Option<EntryContact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryContact {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub linkedin_profile: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntriesPage {
    pub entries: Vec<ProjectEntry>,
    pub has_more: bool,
}

/// Candidate payload of the add-to-project call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePayload {
    pub profile_id: String,
    pub first_name: String,
    pub last_name: String,
    pub headline: String,
    pub linkedin_url: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_job: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub experiences: Vec<Experience>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub educations: Vec<Education>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_years_experience: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddToProjectRequest<'a> {
    pub project_id: &'a str,
    pub profiles: &'a [ProfilePayload],
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddToProjectResult {
    #[serde(default)]
    pub added: u32,
    #[serde(default, deserialize_with = "ids_string_or_number")]
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteRequest<'a> {
    pub content: &'a str,
}

/// Provider ids arrive as strings or bare numbers depending on the endpoint.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn ids_string_or_number<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Id(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Vec<Id>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|Id(id)| id)
        .collect())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
