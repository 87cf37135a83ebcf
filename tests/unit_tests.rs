// Unit tests for Lume Discovery

use chrono::{Duration, Utc};
use lume_discovery::core::{
    distance::{calculate_bounding_box, distance_between, haversine_distance, is_within_bounding_box},
    filters::{build_candidate_query, matches_candidate_query},
    ranking::Ranker,
    scoring::{interest_score, location_score, normalize_interests, score_candidate, ScoringContext},
    swipe::{plan_transition, SwipeIntent, Transition},
};
use lume_discovery::models::{
    Gender, GenderPreference, GeoPoint, Mode, Preference, Profile, ScoringWeights, Swipe, SwipeAction,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn create_test_profile(id: &str, interests: &[&str], location: Option<GeoPoint>) -> Profile {
    Profile {
        user_id: id.to_string(),
        display_name: Some(format!("User {}", id)),
        age: Some(27),
        gender: Some(Gender::Female),
        mode: Mode::Dating,
        interests: interests.iter().map(|s| s.to_string()).collect(),
        location,
        bio: Some("Weekend climber and coffee snob".to_string()),
        updated_at: Utc::now(),
    }
}

fn saigon() -> GeoPoint {
    GeoPoint::new(106.0, 10.0)
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(10.0, 106.0, 10.0, 106.0);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_manhattan_to_brooklyn() {
    // Manhattan to Brooklyn is approximately 5-10 km
    let distance = haversine_distance(40.7580, -73.9855, 40.6782, -73.9442);
    assert!(distance > 5.0 && distance < 15.0);
}

#[test]
fn test_bounding_box_contains_radius() {
    let center = saigon();
    let bbox = calculate_bounding_box(&center, 50.0);

    assert!(is_within_bounding_box(&center, &bbox));
    // ~45 km north is inside both the box and the radius
    let near = GeoPoint::new(106.0, 10.4);
    assert!(is_within_bounding_box(&near, &bbox));
    assert!(distance_between(&center, &near) < 50.0);
    // ~60 km north is outside the box
    assert!(!is_within_bounding_box(&GeoPoint::new(106.0, 10.54), &bbox));
}

#[test]
fn test_location_score_scenario() {
    let actor = Some(saigon());

    assert_eq!(location_score(actor, Some(saigon()), 50.0), 100.0);
    // ~60 km away with a 50 km radius is out of range
    assert_eq!(location_score(actor, Some(GeoPoint::new(106.0, 10.54)), 50.0), 20.0);
    // Missing coordinates are neutral
    assert_eq!(location_score(None, Some(saigon()), 50.0), 50.0);

    // Inside the radius the score stays in [60, 100] and falls with distance
    let near = location_score(actor, Some(GeoPoint::new(106.0, 10.1)), 50.0);
    let far = location_score(actor, Some(GeoPoint::new(106.0, 10.4)), 50.0);
    assert!(near > far && far >= 60.0 && near <= 100.0);
}

#[test]
fn test_interest_score_symmetry() {
    let a = normalize_interests(&["Hiking".to_string(), "jazz".to_string(), "chess".to_string()]);
    let b = normalize_interests(&["hiking ".to_string(), "Chess".to_string(), "sushi".to_string()]);

    assert_eq!(interest_score(&a, &b), interest_score(&b, &a));
    assert!((interest_score(&a, &b) - 50.0).abs() < 1e-9);
    assert_eq!(interest_score(&a, &a), 100.0);
    assert_eq!(interest_score(&a, &normalize_interests(&[])), 50.0);
}

#[test]
fn test_scores_stay_in_bounds() {
    let weights = ScoringWeights::default();
    let now = Utc::now();
    let actor = create_test_profile("actor", &["hiking", "jazz"], Some(saigon()));
    let recent = vec![create_test_profile("r1", &["hiking"], None)];
    let ctx = ScoringContext::new(&actor, 50.0, &recent, now);

    let mut stale = create_test_profile("stale", &[], None);
    stale.bio = None;
    stale.updated_at = now - Duration::days(90);

    let candidates = vec![
        create_test_profile("twin", &["hiking", "jazz"], Some(saigon())),
        create_test_profile("far", &["sushi"], Some(GeoPoint::new(0.0, 0.0))),
        stale,
    ];

    for candidate in &candidates {
        for photos in [0, 3] {
            let b = score_candidate(&ctx, candidate, photos, &weights);
            for s in [b.filter, b.interest, b.activity, b.diversity, b.location, b.total] {
                assert!((0.0..=100.0).contains(&s), "{} out of bounds for {}", s, candidate.user_id);
            }
        }
    }

    let complete = score_candidate(&ctx, &candidates[0], 1, &weights);
    assert_eq!(complete.filter, 100.0);
    assert_eq!(complete.location, 100.0);
}

#[test]
fn test_hard_filters() {
    let actor = create_test_profile("actor", &[], Some(saigon()));
    let mut preference = Preference::default_for("actor");
    preference.age_min = 25;
    preference.age_max = 30;
    preference.gender_preference = vec![GenderPreference::Female];

    let query = build_candidate_query(&actor, &preference, vec!["swiped".to_string()], 100);

    assert!(matches_candidate_query(&create_test_profile("ok", &[], Some(saigon())), &query));
    assert!(!matches_candidate_query(&actor, &query));
    assert!(!matches_candidate_query(&create_test_profile("swiped", &[], Some(saigon())), &query));

    let mut too_old = create_test_profile("old", &[], Some(saigon()));
    too_old.age = Some(41);
    assert!(!matches_candidate_query(&too_old, &query));

    let mut male = create_test_profile("male", &[], Some(saigon()));
    male.gender = Some(Gender::Male);
    assert!(!matches_candidate_query(&male, &query));

    let mut friends = create_test_profile("friends", &[], Some(saigon()));
    friends.mode = Mode::Friend;
    assert!(!matches_candidate_query(&friends, &query));

    assert!(!matches_candidate_query(&create_test_profile("far", &[], Some(GeoPoint::new(106.0, 10.54))), &query));
    assert!(!matches_candidate_query(&create_test_profile("nowhere", &[], None), &query));
}

#[test]
fn test_actor_without_age_or_location_skips_those_filters() {
    let mut actor = create_test_profile("actor", &[], None);
    actor.age = None;
    let query = build_candidate_query(&actor, &Preference::default_for("actor"), Vec::new(), 100);

    assert!(query.age_range.is_none());
    assert!(query.radius.is_none());

    let mut ageless = create_test_profile("c", &[], None);
    ageless.age = None;
    assert!(matches_candidate_query(&ageless, &query));
}

#[test]
fn test_ranking_sorts_and_truncates() {
    let now = Utc::now();
    let actor = create_test_profile("actor", &["hiking", "jazz"], Some(saigon()));
    let ctx = ScoringContext::new(&actor, 50.0, &[], now);

    let pool: Vec<Profile> = (0..10)
        .map(|i| {
            let lat = 10.0 + i as f64 * 0.04;
            create_test_profile(&format!("c{}", i), &["hiking"], Some(GeoPoint::new(106.0, lat)))
        })
        .collect();

    // No shuffling, so the order is strictly by total
    let ranker = Ranker::new(ScoringWeights::default(), 0.0);
    let mut rng = StdRng::seed_from_u64(7);
    let result = ranker.rank(&ctx, pool, &HashMap::new(), 4, &mut rng);

    assert_eq!(result.pool_size, 10);
    assert_eq!(result.ranked.len(), 4);
    assert_eq!(result.ranked[0].profile.user_id, "c0");
    for pair in result.ranked.windows(2) {
        assert!(pair[0].breakdown.total >= pair[1].breakdown.total);
    }
}

#[test]
fn test_swipe_state_machine() {
    let liked = Swipe {
        actor_id: "a".to_string(),
        target_id: "b".to_string(),
        action: SwipeAction::Like,
        is_super_like: false,
        timestamp: Utc::now(),
        score: None,
    };

    assert_eq!(plan_transition(Some(&liked), SwipeIntent::Like).unwrap(), Transition::NoOp);
    assert_eq!(
        plan_transition(Some(&liked), SwipeIntent::SuperLike).unwrap(),
        Transition::UpgradeToSuper
    );
    assert!(plan_transition(Some(&liked), SwipeIntent::Pass).is_err());
}
