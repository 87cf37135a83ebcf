use crate::core::distance::distance_between;
use crate::models::{GeoPoint, Profile, ScoreBreakdown, ScoringWeights};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Score returned when there is no data to compare
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Location score for a candidate beyond the preferred radius
pub const OUT_OF_RANGE_LOCATION_SCORE: f64 = 20.0;

const RECENT_UPDATE_DAYS: i64 = 30;
const DETAILED_BIO_CHARS: usize = 50;
const RICH_INTERESTS: usize = 3;

/// Everything about the actor the scorer needs, computed once per request
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub interests: HashSet<String>,
    pub location: Option<GeoPoint>,
    pub max_distance_km: f64,
    /// Interest sets of the actor's most recent swipe targets
    pub recent_interests: Vec<HashSet<String>>,
    pub now: DateTime<Utc>,
}

impl ScoringContext {
    pub fn new(
        actor: &Profile,
        max_distance_km: f64,
        recent_targets: &[Profile],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            interests: normalize_interests(&actor.interests),
            location: actor.location,
            max_distance_km,
            recent_interests: recent_targets
                .iter()
                .map(|p| normalize_interests(&p.interests))
                .collect(),
            now,
        }
    }
}

/// Lower-cased interest set
pub fn normalize_interests(interests: &[String]) -> HashSet<String> {
    interests.iter().map(|i| i.trim().to_lowercase()).filter(|i| !i.is_empty()).collect()
}

/// |A ∩ B| / |A ∪ B|, 0 when both sets are empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Calculate the rank score (0-100) of a candidate
///
/// Scoring formula:
/// total = (
///     filter * 0.30 +       # profile completeness
///     interest * 0.20 +     # Jaccard overlap with the actor
///     activity * 0.10 +     # recency and richness
///     diversity * 0.15 +    # distance from recent swipe targets
///     location * 0.25       # closer = higher
/// )
pub fn score_candidate(
    ctx: &ScoringContext,
    candidate: &Profile,
    active_photos: usize,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let has_photo = active_photos > 0;
    let candidate_interests = normalize_interests(&candidate.interests);

    let filter = filter_score(candidate, has_photo);
    let interest = interest_score(&ctx.interests, &candidate_interests);
    let activity = activity_score(candidate, has_photo, ctx.now);
    let diversity = diversity_score(&candidate_interests, &ctx.recent_interests);
    let location = location_score(ctx.location, candidate.location, ctx.max_distance_km);

    let total = filter * weights.filter
        + interest * weights.interest
        + activity * weights.activity
        + diversity * weights.diversity
        + location * weights.location;

    ScoreBreakdown {
        filter,
        interest,
        activity,
        diversity,
        location,
        total: round2(total.clamp(0.0, 100.0)),
    }
}

/// Profile completeness: bio, interests and an active photo
///
/// Summed in hundredths so a complete profile is exactly 100.
pub fn filter_score(candidate: &Profile, has_photo: bool) -> f64 {
    let mut hundredths: u32 = 0;
    if !candidate.bio_text().is_empty() {
        hundredths += 3333;
    }
    if !candidate.interests.is_empty() {
        hundredths += 3333;
    }
    if has_photo {
        hundredths += 3334;
    }
    hundredths as f64 / 100.0
}

/// Jaccard similarity of two interest sets scaled to 0-100
///
/// Neutral when either side has no interests, missing data is not penalized.
pub fn interest_score(actor: &HashSet<String>, candidate: &HashSet<String>) -> f64 {
    if actor.is_empty() || candidate.is_empty() {
        return NEUTRAL_SCORE;
    }
    jaccard(actor, candidate) * 100.0
}

/// Activity and richness signals, capped at 100
pub fn activity_score(candidate: &Profile, has_photo: bool, now: DateTime<Utc>) -> f64 {
    let mut score: f64 = 0.0;

    if candidate.updated_at > now - Duration::days(RECENT_UPDATE_DAYS) {
        score += 30.0;
    }
    if candidate.bio_text().chars().count() > DETAILED_BIO_CHARS {
        score += 25.0;
    }
    if candidate.interests.len() >= RICH_INTERESTS {
        score += 25.0;
    }
    if has_photo {
        score += 20.0;
    }

    score.min(100.0)
}

/// 100 minus the average interest similarity to recent swipe targets
///
/// Maximum diversity when there is no history.
pub fn diversity_score(candidate: &HashSet<String>, recent: &[HashSet<String>]) -> f64 {
    if recent.is_empty() {
        return 100.0;
    }

    let total: f64 = recent
        .iter()
        .map(|r| {
            if candidate.is_empty() || r.is_empty() {
                0.0
            } else {
                jaccard(candidate, r)
            }
        })
        .sum();
    let average = total / recent.len() as f64;

    ((1.0 - average) * 100.0).clamp(0.0, 100.0)
}

/// Location score (0-100)
///
/// - neutral 50 when either side lacks coordinates
/// - 20 beyond `max_distance_km`
/// - linear from 100 at 0 km down to 60 at `max_distance_km`
pub fn location_score(
    actor: Option<GeoPoint>,
    candidate: Option<GeoPoint>,
    max_distance_km: f64,
) -> f64 {
    let (Some(a), Some(c)) = (actor, candidate) else {
        return NEUTRAL_SCORE;
    };

    let distance = distance_between(&a, &c);
    if max_distance_km <= 0.0 {
        return if distance <= 0.0 { 100.0 } else { OUT_OF_RANGE_LOCATION_SCORE };
    }
    if distance > max_distance_km {
        return OUT_OF_RANGE_LOCATION_SCORE;
    }

    (100.0 - 40.0 * (distance / max_distance_km)).clamp(60.0, 100.0)
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Mode;

    fn create_test_profile(interests: &[&str], bio: Option<&str>, updated_days_ago: i64) -> Profile {
        Profile {
            user_id: "candidate".to_string(),
            display_name: None,
            age: Some(25),
            gender: None,
            mode: Mode::Dating,
            interests: interests.iter().map(|s| s.to_string()).collect(),
            location: Some(GeoPoint::new(106.0, 10.0)),
            bio: bio.map(str::to_string),
            updated_at: Utc::now() - Duration::days(updated_days_ago),
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_score_complete_profile_is_exactly_100() {
        let profile = create_test_profile(&["music"], Some("hello"), 1);
        assert_eq!(filter_score(&profile, true), 100.0);
        assert_eq!(filter_score(&profile, false), 66.66);
    }

    #[test]
    fn test_filter_score_empty_profile() {
        let profile = create_test_profile(&[], None, 1);
        assert_eq!(filter_score(&profile, false), 0.0);
        assert_eq!(filter_score(&profile, true), 33.34);
    }

    #[test]
    fn test_interest_score_is_case_insensitive() {
        let a = normalize_interests(&["Music".to_string(), "HIKING".to_string()]);
        let b = normalize_interests(&["music".to_string(), "hiking".to_string()]);
        assert_eq!(interest_score(&a, &b), 100.0);
    }

    #[test]
    fn test_interest_score_neutral_when_empty() {
        assert_eq!(interest_score(&set(&[]), &set(&["music"])), NEUTRAL_SCORE);
        assert_eq!(interest_score(&set(&["music"]), &set(&[])), NEUTRAL_SCORE);
    }

    #[test]
    fn test_interest_score_partial_overlap() {
        // 1 shared out of 3 distinct
        let score = interest_score(&set(&["a", "b"]), &set(&["b", "c"]));
        assert!((score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_activity_score() {
        let long_bio = "x".repeat(60);
        let rich = create_test_profile(&["a", "b", "c"], Some(&long_bio), 2);
        assert_eq!(activity_score(&rich, true, Utc::now()), 100.0);

        let stale = create_test_profile(&["a"], Some("short"), 45);
        assert_eq!(activity_score(&stale, false, Utc::now()), 0.0);
    }

    #[test]
    fn test_diversity_score() {
        assert_eq!(diversity_score(&set(&["a"]), &[]), 100.0);
        assert_eq!(diversity_score(&set(&["a"]), &[set(&["a"])]), 0.0);
        assert_eq!(diversity_score(&set(&["a"]), &[set(&["a"]), set(&["b"])]), 50.0);
        assert_eq!(diversity_score(&set(&[]), &[set(&["a"])]), 100.0);
    }

    #[test]
    fn test_location_score() {
        let here = GeoPoint::new(106.0, 10.0);
        assert_eq!(location_score(Some(here), Some(here), 50.0), 100.0);
        assert_eq!(location_score(None, Some(here), 50.0), NEUTRAL_SCORE);
        assert_eq!(location_score(Some(here), None, 50.0), NEUTRAL_SCORE);

        // ~60 km north
        let far = GeoPoint::new(106.0, 10.54);
        assert_eq!(location_score(Some(here), Some(far), 50.0), OUT_OF_RANGE_LOCATION_SCORE);

        // ~25 km north, halfway through the radius
        let mid = GeoPoint::new(106.0, 10.2248);
        let score = location_score(Some(here), Some(mid), 50.0);
        assert!((score - 80.0).abs() < 0.5, "expected ~80, got {}", score);
    }

    #[test]
    fn test_total_is_weighted_and_rounded() {
        let actor = create_test_profile(&["music"], None, 1);
        let ctx = ScoringContext::new(&actor, 50.0, &[], Utc::now());
        let candidate = create_test_profile(&["music"], Some("hi"), 1);

        let breakdown = score_candidate(&ctx, &candidate, 1, &ScoringWeights::default());

        assert_eq!(breakdown.filter, 100.0);
        assert_eq!(breakdown.interest, 100.0);
        assert_eq!(breakdown.activity, 50.0);
        assert_eq!(breakdown.diversity, 100.0);
        assert_eq!(breakdown.location, 100.0);
        // 30 + 20 + 5 + 15 + 25
        assert_eq!(breakdown.total, 95.0);
    }
}
