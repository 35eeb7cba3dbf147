//! Result Ranker: merges scores into profiles and orders them for display.

use std::collections::HashMap;

use serde::Serialize;

use crate::sourcing::profile::{Profile, ScoreResult, ScoredProfile};

/// Justification given to profiles the model left out of its answer.
pub const NOT_SCORED: &str = "not scored";

/// Default display and push floor.
pub const DEFAULT_SCORE_FLOOR: u8 = 6;

/// Merges each profile with its score by `profile_id`. When the model returns
/// the same id twice the last entry wins; a missing id scores 0 and is kept.
pub fn merge_scores(profiles: Vec<Profile>, scores: Vec<ScoreResult>) -> Vec<ScoredProfile> {
    let mut by_id: HashMap<String, ScoreResult> = scores
        .into_iter()
        .map(|s| (s.profile_id.trim().to_string(), s))
        .collect();

    profiles
        .into_iter()
        .map(|profile| match by_id.remove(&profile.profile_id) {
            Some(result) => ScoredProfile {
                profile,
                score: result.score,
                justification: result.justification,
            },
            None => ScoredProfile {
                profile,
                score: 0,
                justification: NOT_SCORED.to_string(),
            },
        })
        .collect()
}

/// Sorts by descending score. The sort is stable, so equal scores keep
/// retrieval order.
pub fn rank(mut scored: Vec<ScoredProfile>) -> Vec<ScoredProfile> {
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Profiles at or above `floor`. Used for both the display and push floors.
pub fn at_or_above(ranked: &[ScoredProfile], floor: u8) -> Vec<ScoredProfile> {
    ranked.iter().filter(|p| p.score >= floor).cloned().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Partial,
    Weak,
}

impl ScoreBand {
    pub fn of(score: u8) -> Self {
        match score {
            8.. => ScoreBand::Excellent,
            6..=7 => ScoreBand::Good,
            4..=5 => ScoreBand::Partial,
            _ => ScoreBand::Weak,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BandGroup {
    pub band: ScoreBand,
    pub profile_ids: Vec<String>,
}

/// Groups ranked profiles by band, best band first, dropping empty bands.
pub fn group_by_band(ranked: &[ScoredProfile]) -> Vec<BandGroup> {
    [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::Partial,
        ScoreBand::Weak,
    ]
    .into_iter()
    .map(|band| BandGroup {
        band,
        profile_ids: ranked
            .iter()
            .filter(|p| ScoreBand::of(p.score) == band)
            .map(|p| p.profile.profile_id.clone())
            .collect(),
    })
    .filter(|group| !group.profile_ids.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sourcing::profile::testing::{profile, scored};

    fn score(id: &str, score: u8) -> ScoreResult {
        ScoreResult {
            profile_id: id.to_string(),
            score,
            justification: format!("because {id}"),
        }
    }

    fn ids(scored: &[ScoredProfile]) -> Vec<&str> {
        scored.iter().map(|p| p.profile.profile_id.as_str()).collect()
    }

    #[test]
    fn test_missing_score_defaults_to_zero_and_is_kept() {
        let profiles = vec![
            profile("a", "A", "A", None),
            profile("b", "B", "B", None),
        ];
        let merged = merge_scores(profiles, vec![score("a", 9)]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].score, 9);
        assert_eq!(merged[1].score, 0);
        assert_eq!(merged[1].justification, NOT_SCORED);

        let ranked = rank(merged);
        assert_eq!(ids(&ranked), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_and_duplicate_ids() {
        let profiles = vec![profile("a", "A", "A", None)];
        let merged = merge_scores(
            profiles,
            vec![score("zzz", 10), score("a", 3), score(" a ", 5)],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 5, "last entry for an id wins");
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let ranked = rank(vec![
            scored("first", 7),
            scored("low", 2),
            scored("second", 7),
            scored("top", 9),
            scored("third", 7),
        ]);
        assert_eq!(ids(&ranked), vec!["top", "first", "second", "third", "low"]);
    }

    #[test]
    fn test_floors_are_independent() {
        let ranked = rank(vec![scored("a", 9), scored("b", 6), scored("c", 4)]);
        assert_eq!(ids(&at_or_above(&ranked, 6)), vec!["a", "b"]);
        assert_eq!(ids(&at_or_above(&ranked, 8)), vec!["a"]);
        assert_eq!(at_or_above(&ranked, 0).len(), 3);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::of(10), ScoreBand::Excellent);
        assert_eq!(ScoreBand::of(8), ScoreBand::Excellent);
        assert_eq!(ScoreBand::of(7), ScoreBand::Good);
        assert_eq!(ScoreBand::of(4), ScoreBand::Partial);
        assert_eq!(ScoreBand::of(3), ScoreBand::Weak);
    }

    #[test]
    fn test_group_by_band_skips_empty_bands() {
        let ranked = rank(vec![scored("a", 9), scored("b", 8), scored("c", 1)]);
        let groups = group_by_band(&ranked);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].band, ScoreBand::Excellent);
        assert_eq!(groups[0].profile_ids, vec!["a", "b"]);
        assert_eq!(groups[1].band, ScoreBand::Weak);
    }
}
