//! Write-Back Dispatcher: adds accepted profiles to a provider project in
//! batches, then attaches a score note to every returned contact.
//!
//! Delivery is at-most-once per call: a failed batch aborts the push with the
//! batches before it already written. Note failures are logged and skipped.
//! Notes pair contact ids with profiles by position, so a batch whose id count
//! differs from its size gets no notes.

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::governor;
use crate::provider::models::ProfilePayload;
use crate::provider::SourcingApi;
use crate::sourcing::profile::ScoredProfile;
use crate::sourcing::ranking::at_or_above;

/// Profiles per add-to-project call. The provider rejects more than 100.
pub const PUSH_BATCH_SIZE: usize = 50;
pub const PROVIDER_MAX_BATCH: usize = 100;

const _: () = assert!(PUSH_BATCH_SIZE <= PROVIDER_MAX_BATCH);

#[derive(Debug, Default, Serialize)]
pub struct PushReport {
    pub requested: usize,
    pub added: u32,
    pub contact_ids: Vec<String>,
    pub notes_attached: usize,
    pub notes_failed: usize,
    /// Profiles whose note was not sent because contact ids could not be paired.
    pub notes_skipped: usize,
}

pub fn to_payload(scored: &ScoredProfile) -> ProfilePayload {
    let p = &scored.profile;
    ProfilePayload {
        profile_id: p.profile_id.clone(),
        first_name: p.first_name.clone(),
        last_name: p.last_name.clone(),
        headline: p.headline.clone(),
        linkedin_url: p.linkedin_url.clone().unwrap_or_default(),
        location: p.location.clone(),
        current_job: p.current_job.clone(),
        experiences: p.experiences.clone(),
        educations: p.educations.clone(),
        skills: p.skills.clone(),
        total_years_experience: p.total_years_experience.filter(|y| *y > 0.0),
        picture_url: p.picture_url.clone(),
    }
}

pub fn note_content(scored: &ScoredProfile) -> String {
    format!("Score: {}/10\n{}", scored.score, scored.justification)
}

/// Pushes every profile scoring at least `push_floor` into `project_id`.
pub async fn push_profiles(
    api: &dyn SourcingApi,
    project_id: &str,
    ranked: &[ScoredProfile],
    push_floor: u8,
) -> Result<PushReport, AppError> {
    let accepted = at_or_above(ranked, push_floor);
    let mut report = PushReport {
        requested: accepted.len(),
        ..Default::default()
    };
    // (contact id, note) pairs, in push order.
    let mut notes: Vec<(String, String)> = Vec::new();

    for batch in accepted.chunks(PUSH_BATCH_SIZE) {
        let payload: Vec<ProfilePayload> = batch.iter().map(to_payload).collect();
        let result = api.add_profiles_to_project(project_id, &payload).await?;

        report.added += result.added;
        if result.contact_ids.len() == batch.len() {
            notes.extend(
                result
                    .contact_ids
                    .iter()
                    .zip(batch)
                    .map(|(contact_id, scored)| (contact_id.clone(), note_content(scored))),
            );
        } else {
            warn!(
                project_id,
                batch = batch.len(),
                contact_ids = result.contact_ids.len(),
                "Contact ids do not match the batch, skipping its score notes"
            );
            report.notes_skipped += batch.len();
        }
        report.contact_ids.extend(result.contact_ids);

        info!(project_id, batch = payload.len(), added = report.added, "Pushed batch");
        tokio::time::sleep(governor::PUSH_BATCH_DELAY).await;
    }

    for (contact_id, content) in &notes {
        match api.add_note(contact_id, content).await {
            Ok(()) => report.notes_attached += 1,
            Err(e) => {
                warn!(contact_id = %contact_id, error = %e, "Failed to attach score note");
                report.notes_failed += 1;
            }
        }
        tokio::time::sleep(governor::NOTE_DELAY).await;
    }

    info!(
        project_id,
        added = report.added,
        notes_attached = report.notes_attached,
        notes_failed = report.notes_failed,
        notes_skipped = report.notes_skipped,
        "Push complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::testing::MockSourcingApi;
    use crate::sourcing::profile::testing::scored;

    fn ranked(n: usize, score: u8) -> Vec<ScoredProfile> {
        (0..n).map(|i| scored(&format!("p{i}"), score)).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_batches_of_fifty_with_one_note_per_contact() {
        let api = MockSourcingApi {
            failing_note_contacts: vec!["contact-p7".to_string()],
            ..Default::default()
        };

        let report = push_profiles(&api, "proj", &ranked(120, 8), 6)
            .await
            .unwrap();

        let sizes: Vec<usize> = api
            .pushed_batches
            .lock()
            .unwrap()
            .iter()
            .map(Vec::len)
            .collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(report.added, 120);
        assert_eq!(report.contact_ids.len(), 120);

        let notes = api.notes.lock().unwrap();
        assert_eq!(notes.len(), 120, "one attempt per contact, failures included");
        assert_eq!(report.notes_failed, 1);
        assert_eq!(report.notes_attached, 119);
        assert_eq!(notes[0].0, "contact-p0");
        assert_eq!(notes[0].1, "Score: 8/10\njustification for p0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_skips_notes_when_contact_ids_are_short() {
        let api = MockSourcingApi {
            contact_ids_per_batch: Some(48),
            ..Default::default()
        };

        let report = push_profiles(&api, "proj", &ranked(70, 8), 6).await.unwrap();

        assert_eq!(report.contact_ids.len(), 48 + 20);
        assert_eq!(report.notes_skipped, 50);
        assert_eq!(report.notes_attached, 20);
        let notes = api.notes.lock().unwrap();
        assert_eq!(notes.len(), 20);
        assert_eq!(notes[0].0, "contact-p50");
        assert!(notes[0].1.ends_with("justification for p50"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_respects_floor() {
        let mut profiles = ranked(3, 9);
        profiles.extend(ranked(2, 4).into_iter().map(|mut p| {
            p.profile.profile_id.push_str("-low");
            p
        }));
        let api = MockSourcingApi::default();

        let report = push_profiles(&api, "proj", &profiles, 7).await.unwrap();
        assert_eq!(report.requested, 3);
        assert_eq!(api.pushed_batches.lock().unwrap()[0].len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_nothing_above_floor_makes_no_calls() {
        let api = MockSourcingApi::default();
        let report = push_profiles(&api, "proj", &ranked(4, 2), 6).await.unwrap();
        assert_eq!(report.added, 0);
        assert!(api.pushed_batches.lock().unwrap().is_empty());
        assert!(api.notes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_payload_omits_empty_enrichment() {
        let payload = to_payload(&scored("p1", 7));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["linkedin_url"], "");
        assert!(value.get("skills").is_none());
        assert!(value.get("experiences").is_none());
        assert!(value.get("total_years_experience").is_none());
    }
}
