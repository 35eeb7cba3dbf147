//! Source Adapters: one retrieval contract over the three provider backends.
//!
//! The scraped database and the internal CRM share the generic sourcing search;
//! the live network has its own endpoint, resolves regions to location ids and
//! is metered by the daily quota.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::governor::{self, QuotaGovernor};
use crate::provider::models::{
    CompanyFilter, ContactsFilter, IncludeExclude, LiveSearchRequest, LocationFilter,
    SearchFilters, SourceType, SourcingSearchRequest,
};
use crate::provider::SourcingApi;
use crate::sourcing::boolean_query::sanitize_boolean_query;
use crate::sourcing::criteria::SearchCriteria;
use crate::sourcing::profile::{normalize_page, Profile, ProfileSource};

/// Profiles requested per search page, for every backend.
pub const PAGE_SIZE: u32 = 25;

const DEFAULT_COUNTRY: &str = "France";
const CRM_CONTACT_TYPE: &str = "candidate";

/// The backend a run retrieves from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum SourceAdapter {
    ScrapedDatabase,
    LiveNetwork { account_id: String },
    Crm,
}

impl SourceAdapter {
    pub fn source_type(&self) -> SourceType {
        match self {
            SourceAdapter::ScrapedDatabase => SourceType::ScrapedDatabase,
            SourceAdapter::LiveNetwork { .. } => SourceType::LiveNetwork,
            SourceAdapter::Crm => SourceType::Crm,
        }
    }

    /// Accepted `max_profiles` values for this backend.
    pub fn max_profiles_range(&self) -> RangeInclusive<u32> {
        match self {
            SourceAdapter::LiveNetwork { .. } => 25..=250,
            _ => 25..=1000,
        }
    }

    /// The live network filters by location provider-side; the others need
    /// the local substring filter.
    pub fn applies_location_filter(&self) -> bool {
        !matches!(self, SourceAdapter::LiveNetwork { .. })
    }
}

/// Outcome of one paginated retrieval, before any local filtering.
#[derive(Debug, Default)]
pub struct Retrieval {
    pub profiles: Vec<Profile>,
    pub total_available: Option<u32>,
    pub has_more: bool,
    pub pages: u32,
    /// Live-network profiles flagged by the provider as already in the project.
    pub already_in_project: usize,
    pub filters_too_strict: bool,
    pub warnings: Vec<String>,
}

/// Pages through `adapter` until `max_profiles` is reached or the provider
/// runs out of results. Provider errors abort the retrieval as-is.
pub async fn retrieve(
    adapter: &SourceAdapter,
    api: &dyn SourcingApi,
    quota: &QuotaGovernor,
    project_id: &str,
    criteria: &SearchCriteria,
    max_profiles: u32,
) -> Result<Retrieval, AppError> {
    let retrieval = match adapter {
        SourceAdapter::LiveNetwork { account_id } => {
            search_live_network(api, quota, account_id, project_id, criteria, max_profiles).await?
        }
        _ => {
            search_database(api, adapter.source_type(), project_id, criteria, max_profiles)
                .await?
        }
    };

    info!(
        source = ?adapter.source_type(),
        pages = retrieval.pages,
        profiles = retrieval.profiles.len(),
        total_available = ?retrieval.total_available,
        "Retrieval complete"
    );
    Ok(retrieval)
}

// ────────────────────────────────────────────────────────────────────────────
// Scraped database / internal CRM
// ────────────────────────────────────────────────────────────────────────────

/// Builds the filter object of the generic sourcing search.
pub fn build_filters(criteria: &SearchCriteria, source_type: SourceType) -> SearchFilters {
    let countries = if criteria.locations.countries.is_empty() {
        vec![DEFAULT_COUNTRY.to_string()]
    } else {
        criteria.locations.countries.clone()
    };

    SearchFilters {
        job_titles: IncludeExclude::non_empty(
            &criteria.job_titles.include,
            &criteria.job_titles.exclude,
        ),
        keywords: IncludeExclude::non_empty(&criteria.keywords.include, &criteria.keywords.exclude),
        locations: LocationFilter {
            countries,
            states: criteria.locations.regions.clone(),
        },
        years_experience: criteria.years_experience,
        companies: (!criteria.companies.exclude.is_empty()).then(|| CompanyFilter {
            exclude: criteria.companies.exclude.clone(),
        }),
        contacts_filters: (source_type == SourceType::Crm).then(|| ContactsFilter {
            contact_types: vec![CRM_CONTACT_TYPE.to_string()],
        }),
    }
}

async fn search_database(
    api: &dyn SourcingApi,
    source_type: SourceType,
    project_id: &str,
    criteria: &SearchCriteria,
    max_profiles: u32,
) -> Result<Retrieval, AppError> {
    let filters = build_filters(criteria, source_type);
    let source = ProfileSource::from(source_type);
    let cap = max_profiles as usize;
    let mut retrieval = Retrieval::default();
    let mut page = 1;

    loop {
        let request = SourcingSearchRequest {
            project_id: project_id.to_string(),
            source_type,
            filters: filters.clone(),
            page,
            page_size: PAGE_SIZE,
        };
        let result = api.sourcing_search(&request).await?;
        retrieval.pages += 1;
        retrieval.filters_too_strict |= result.filters_too_strict;
        if result.total_count.is_some() {
            retrieval.total_available = result.total_count;
        }
        retrieval.has_more = result.has_more;

        if result.profiles.is_empty() {
            break;
        }
        retrieval.profiles.extend(normalize_page(result.profiles, source));

        let target = retrieval
            .total_available
            .map_or(cap, |total| cap.min(total as usize));
        debug!(page, collected = retrieval.profiles.len(), target, "Fetched search page");

        if !result.has_more || retrieval.profiles.len() >= target {
            break;
        }
        page += 1;
        tokio::time::sleep(governor::DATABASE_PAGE_DELAY).await;
    }

    retrieval.profiles.truncate(cap);
    if retrieval.filters_too_strict {
        warn!("Provider reports the search filters are too strict");
        retrieval
            .warnings
            .push("The provider reports the search filters are too strict.".to_string());
    }
    Ok(retrieval)
}

// ────────────────────────────────────────────────────────────────────────────
// Live network
// ────────────────────────────────────────────────────────────────────────────

/// Resolves each region to the first matching provider location id.
/// Unresolved regions are reported as warnings and left out of the search.
pub async fn resolve_locations(
    api: &dyn SourcingApi,
    account_id: &str,
    regions: &[String],
    warnings: &mut Vec<String>,
) -> Result<Vec<String>, AppError> {
    let mut location_ids: Vec<String> = Vec::new();

    for region in regions {
        let matches = api.lookup_locations(region, account_id).await?;
        match matches.into_iter().next() {
            Some(location) => {
                debug!(region = %region, id = %location.id, title = %location.title, "Resolved location");
                if !location_ids.contains(&location.id) {
                    location_ids.push(location.id);
                }
            }
            None => {
                warn!(region = %region, "Location not found on the live network");
                warnings.push(format!("Location '{region}' could not be resolved and was ignored."));
            }
        }
    }

    Ok(location_ids)
}

async fn search_live_network(
    api: &dyn SourcingApi,
    quota: &QuotaGovernor,
    account_id: &str,
    project_id: &str,
    criteria: &SearchCriteria,
    max_profiles: u32,
) -> Result<Retrieval, AppError> {
    if quota.is_exhausted() {
        return Err(AppError::QuotaExceeded {
            used: quota.used(),
            limit: quota.daily_limit(),
        });
    }

    let mut retrieval = Retrieval::default();
    let cap = quota.clamp(max_profiles);
    if cap < max_profiles {
        warn!(requested = max_profiles, cap, "Profile cap lowered to remaining daily quota");
        retrieval.warnings.push(format!(
            "Only {cap} live-network profiles left today; retrieval limited to {cap}."
        ));
    }
    let cap = cap as usize;

    let location_ids =
        resolve_locations(api, account_id, &criteria.locations.regions, &mut retrieval.warnings)
            .await?;
    let boolean_query = criteria
        .boolean_query
        .as_deref()
        .map(sanitize_boolean_query)
        .filter(|q| !q.is_empty());
    let years_experience =
        (!criteria.years_experience.is_unbounded()).then_some(criteria.years_experience);

    let mut page = 1;
    while retrieval.profiles.len() < cap {
        if quota.is_exhausted() {
            warn!(used = quota.used(), "Daily live-network quota reached mid-run");
            retrieval
                .warnings
                .push("Daily live-network quota reached during retrieval; stopped early.".to_string());
            break;
        }

        let request = LiveSearchRequest {
            project_id: project_id.to_string(),
            account_id: account_id.to_string(),
            page,
            page_size: PAGE_SIZE,
            job_titles: criteria.job_titles.include.clone(),
            location_ids: location_ids.clone(),
            years_experience,
            boolean_query: boolean_query.clone(),
        };
        let result = api.live_network_search(&request).await?;
        retrieval.pages += 1;
        retrieval.has_more = result.has_more;
        if result.total_count.is_some() {
            retrieval.total_available = result.total_count;
        }

        if result.profiles.is_empty() {
            break;
        }
        // Every returned profile counts against the quota, flagged ones included.
        quota.record(result.profiles.len() as u32);

        let (flagged, fresh): (Vec<_>, Vec<_>) = result
            .profiles
            .into_iter()
            .partition(|raw| raw.already_in_project);
        retrieval.already_in_project += flagged.len();
        retrieval
            .profiles
            .extend(normalize_page(fresh, ProfileSource::LiveNetwork));

        debug!(
            page,
            collected = retrieval.profiles.len(),
            used = quota.used(),
            limit = quota.daily_limit(),
            "Fetched live-network page"
        );

        if !result.has_more {
            break;
        }
        page += 1;
        tokio::time::sleep(governor::live_network_page_delay()).await;
    }

    retrieval.profiles.truncate(cap);
    Ok(retrieval)
}
