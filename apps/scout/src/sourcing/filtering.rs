//! Deduplication, existing-entry exclusion and the location safety filter.
//!
//! Identity uses the LinkedIn URL when non-empty and the lowercased, trimmed
//! `"first last"` name when non-blank. Within one retrieval the profile id is
//! a key too. A profile collides with another if any key matches; empty keys
//! never collide.

use std::collections::HashSet;

use crate::provider::models::ProjectEntry;
use crate::sourcing::profile::{normalized_full_name, Profile};

/// Set of identity keys already seen.
#[derive(Debug, Default)]
struct IdentityIndex {
    ids: HashSet<String>,
    urls: HashSet<String>,
    names: HashSet<String>,
}

impl IdentityIndex {
    fn insert_profile(&mut self, profile: &Profile) {
        self.ids.insert(profile.profile_id.clone());
        self.insert(profile.identity_url(), profile.normalized_name());
    }

    fn insert(&mut self, url: Option<&str>, name: Option<String>) {
        if let Some(url) = url {
            self.urls.insert(url.to_string());
        }
        if let Some(name) = name {
            self.names.insert(name);
        }
    }

    fn contains(&self, profile: &Profile) -> bool {
        self.ids.contains(&profile.profile_id)
            || profile
            .identity_url()
            .is_some_and(|url| self.urls.contains(url))
            || profile
                .normalized_name()
                .is_some_and(|name| self.names.contains(&name))
    }
}

/// Single pass, first-seen wins. Output order follows input order.
pub fn deduplicate(profiles: Vec<Profile>) -> Vec<Profile> {
    let mut index = IdentityIndex::default();
    let mut unique = Vec::with_capacity(profiles.len());

    for profile in profiles {
        if index.contains(&profile) {
            continue;
        }
        index.insert_profile(&profile);
        unique.push(profile);
    }

    unique
}

#[derive(Debug)]
pub struct Exclusion {
    pub kept: Vec<Profile>,
    pub skipped: usize,
}

/// Removes profiles already present in the destination project, matched by
/// the stored LinkedIn URL or the contact's name.
pub fn exclude_existing(profiles: Vec<Profile>, existing: &[ProjectEntry]) -> Exclusion {
    let mut index = IdentityIndex::default();
    for contact in existing.iter().filter_map(|e| e.contact.as_ref()) {
        let url = contact
            .linkedin_profile
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());
        let name = normalized_full_name(
            contact.first_name.as_deref().unwrap_or_default(),
            contact.last_name.as_deref().unwrap_or_default(),
        );
        index.insert(url, name);
    }

    let before = profiles.len();
    let kept: Vec<Profile> = profiles
        .into_iter()
        .filter(|p| !index.contains(p))
        .collect();

    Exclusion {
        skipped: before - kept.len(),
        kept,
    }
}

#[derive(Debug)]
pub struct LocationFiltered {
    pub kept: Vec<Profile>,
    pub excluded: Vec<Profile>,
}

/// Region terms: comma/whitespace separated, lowercased, longer than 2 characters.
pub fn region_terms(region: &str) -> Vec<String> {
    region
        .to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .filter(|term| term.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Keeps profiles with an unknown (empty) location or whose location contains
/// any region term, case-insensitively. Pure substring matching: no geocoding,
/// so a city inside the region is excluded unless it shares a term.
pub fn filter_by_location(profiles: Vec<Profile>, region: &str) -> LocationFiltered {
    let terms = region_terms(region);
    if region.trim().is_empty() {
        return LocationFiltered {
            kept: profiles,
            excluded: Vec::new(),
        };
    }

    let (kept, excluded) = profiles.into_iter().partition(|p| {
        let location = p.location.to_lowercase();
        location.trim().is_empty() || terms.iter().any(|term| location.contains(term.as_str()))
    });

    LocationFiltered { kept, excluded }
}
