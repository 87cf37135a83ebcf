use crate::core::distance::{calculate_bounding_box, distance_between, is_within_bounding_box};
use crate::models::{CandidateQuery, Preference, Profile, RadiusFilter, UserId};
use std::collections::HashSet;

/// Build the hard-filter query for a candidate pool fetch
///
/// Hard filters are never soft-scored:
/// - self and every id in `exclude_ids` (already swiped, blocked, client supplied)
/// - mode equality
/// - age range, only when the actor has an age set
/// - gender preference, skipped when it contains `all`
/// - radius, only when the actor has a location and a max distance is set
pub fn build_candidate_query(
    actor: &Profile,
    preference: &Preference,
    exclude_ids: impl IntoIterator<Item = UserId>,
    pool_limit: usize,
) -> CandidateQuery {
    let mut exclude_user_ids: HashSet<UserId> = exclude_ids.into_iter().collect();
    exclude_user_ids.insert(actor.user_id.clone());

    let age_range = actor
        .age
        .map(|_| (preference.age_min, preference.age_max));

    let radius = match (actor.location, preference.max_distance_km) {
        (Some(center), Some(max_distance_km)) if max_distance_km > 0.0 => Some(RadiusFilter {
            center,
            max_distance_km,
            bounding_box: calculate_bounding_box(&center, max_distance_km),
        }),
        _ => None,
    };

    CandidateQuery {
        actor_id: actor.user_id.clone(),
        mode: preference.mode,
        age_range,
        genders: preference.gender_filter(),
        radius,
        exclude_user_ids,
        limit: pool_limit,
    }
}

/// Check a profile against every hard filter of a candidate query
///
/// A candidate missing the field a filter needs (age, gender, location)
/// does not pass that filter.
#[inline]
pub fn matches_candidate_query(profile: &Profile, query: &CandidateQuery) -> bool {
    if profile.user_id == query.actor_id || query.exclude_user_ids.contains(&profile.user_id) {
        return false;
    }

    if profile.mode != query.mode {
        return false;
    }

    if let Some((min_age, max_age)) = query.age_range {
        match profile.age {
            Some(age) if age >= min_age && age <= max_age => {}
            _ => return false,
        }
    }

    if let Some(genders) = &query.genders {
        match profile.gender {
            Some(gender) if genders.contains(&gender) => {}
            _ => return false,
        }
    }

    if let Some(radius) = &query.radius {
        let Some(location) = profile.location else {
            return false;
        };
        // Stage 1: bounding box, Stage 2: exact great-circle distance
        if !is_within_bounding_box(&location, &radius.bounding_box) {
            return false;
        }
        if distance_between(&radius.center, &location) > radius.max_distance_km {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, GenderPreference, GeoPoint, Mode};
    use chrono::Utc;

    fn create_test_profile(id: &str, age: Option<u8>, gender: Option<Gender>) -> Profile {
        Profile {
            user_id: id.to_string(),
            display_name: Some(format!("User {}", id)),
            age,
            gender,
            mode: Mode::Dating,
            interests: vec!["hiking".to_string()],
            location: Some(GeoPoint::new(106.70, 10.78)),
            bio: None,
            updated_at: Utc::now(),
        }
    }

    fn create_test_preferences() -> Preference {
        Preference {
            user_id: "actor".to_string(),
            age_min: 21,
            age_max: 35,
            gender_preference: vec![GenderPreference::Female],
            max_distance_km: Some(50.0),
            mode: Mode::Dating,
            interests: vec![],
        }
    }

    #[test]
    fn test_candidate_passes_all_filters() {
        let actor = create_test_profile("actor", Some(28), Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);
        let candidate = create_test_profile("c1", Some(25), Some(Gender::Female));

        assert!(matches_candidate_query(&candidate, &query));
    }

    #[test]
    fn test_self_and_excluded_ids_filtered() {
        let actor = create_test_profile("actor", Some(28), Some(Gender::Female));
        let mut pref = create_test_preferences();
        pref.gender_preference = vec![GenderPreference::All];
        let query = build_candidate_query(&actor, &pref, vec!["c1".to_string()], 100);

        assert!(!matches_candidate_query(&actor, &query));
        assert!(!matches_candidate_query(
            &create_test_profile("c1", Some(25), Some(Gender::Female)),
            &query
        ));
    }

    #[test]
    fn test_age_filter_skipped_without_actor_age() {
        let actor = create_test_profile("actor", None, Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);
        assert!(query.age_range.is_none());

        let older = create_test_profile("c1", Some(60), Some(Gender::Female));
        assert!(matches_candidate_query(&older, &query));
    }

    #[test]
    fn test_age_filter_applied_with_actor_age() {
        let actor = create_test_profile("actor", Some(30), Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);

        assert!(!matches_candidate_query(
            &create_test_profile("c1", Some(60), Some(Gender::Female)),
            &query
        ));
        assert!(!matches_candidate_query(
            &create_test_profile("c2", None, Some(Gender::Female)),
            &query
        ));
    }

    #[test]
    fn test_gender_filter() {
        let actor = create_test_profile("actor", Some(28), Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);

        assert!(!matches_candidate_query(
            &create_test_profile("c1", Some(25), Some(Gender::Male)),
            &query
        ));
    }

    #[test]
    fn test_mode_filter() {
        let actor = create_test_profile("actor", Some(28), Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);
        let mut friend = create_test_profile("c1", Some(25), Some(Gender::Female));
        friend.mode = Mode::Friend;

        assert!(!matches_candidate_query(&friend, &query));
    }

    #[test]
    fn test_radius_filter() {
        let actor = create_test_profile("actor", Some(28), Some(Gender::Male));
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);

        // Roughly 95 km north
        let mut far = create_test_profile("far", Some(25), Some(Gender::Female));
        far.location = Some(GeoPoint::new(106.70, 11.63));
        assert!(!matches_candidate_query(&far, &query));

        let mut unknown = create_test_profile("unknown", Some(25), Some(Gender::Female));
        unknown.location = None;
        assert!(!matches_candidate_query(&unknown, &query));
    }

    #[test]
    fn test_radius_skipped_without_actor_location() {
        let mut actor = create_test_profile("actor", Some(28), Some(Gender::Male));
        actor.location = None;
        let query = build_candidate_query(&actor, &create_test_preferences(), vec![], 100);
        assert!(query.radius.is_none());

        let mut far = create_test_profile("far", Some(25), Some(Gender::Female));
        far.location = Some(GeoPoint::new(2.35, 48.85));
        assert!(matches_candidate_query(&far, &query));
    }
}
