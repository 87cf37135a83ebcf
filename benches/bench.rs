// Criterion benchmarks for Lume Discovery

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lume_discovery::core::{
    distance::{calculate_bounding_box, haversine_distance},
    filters::{build_candidate_query, matches_candidate_query},
    ranking::Ranker,
    scoring::ScoringContext,
};
use lume_discovery::models::{Gender, GeoPoint, Mode, Preference, Profile, UserId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

const INTERESTS: [&str; 8] = ["hiking", "jazz", "chess", "surfing", "cooking", "yoga", "film", "travel"];

fn create_candidate(id: usize, lat: f64, lon: f64) -> Profile {
    Profile {
        user_id: format!("user-{}", id),
        display_name: Some(format!("User {}", id)),
        age: Some(21 + (id % 15) as u8),
        gender: Some(if id % 2 == 0 { Gender::Female } else { Gender::Male }),
        mode: Mode::Dating,
        interests: (0..(id % 5)).map(|k| INTERESTS[(id + k) % INTERESTS.len()].to_string()).collect(),
        location: Some(GeoPoint::new(lon, lat)),
        bio: (id % 3 != 0).then(|| "Coffee first, then adventures".to_string()),
        updated_at: Utc::now(),
    }
}

fn create_pool(count: usize) -> Vec<Profile> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.001) % 0.5;
            let lon_offset = (i as f64 * 0.001) % 0.5;
            create_candidate(i, 10.0 + lat_offset, 106.0 + lon_offset)
        })
        .collect()
}

fn actor() -> Profile {
    let mut actor = create_candidate(usize::MAX / 2, 10.0, 106.0);
    actor.user_id = "current_user".to_string();
    actor.interests = vec!["hiking".to_string(), "jazz".to_string(), "film".to_string()];
    actor
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(10.0),
                black_box(106.0),
                black_box(10.02),
                black_box(106.01),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    let center = GeoPoint::new(106.0, 10.0);
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| calculate_bounding_box(black_box(&center), black_box(50.0)));
    });
}

fn bench_ranking(c: &mut Criterion) {
    let ranker = Ranker::default();
    let actor = actor();
    let recent: Vec<Profile> = create_pool(20);
    let ctx = ScoringContext::new(&actor, 50.0, &recent, Utc::now());

    let mut group = c.benchmark_group("ranking");

    for candidate_count in [10, 50, 100, 500, 1000].iter() {
        let candidates = create_pool(*candidate_count);
        let photo_counts: HashMap<UserId, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, p)| (p.user_id.clone(), i % 4))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("rank", candidate_count),
            candidate_count,
            |b, _| {
                let mut rng = StdRng::seed_from_u64(42);
                b.iter(|| {
                    ranker.rank(
                        black_box(&ctx),
                        black_box(candidates.clone()),
                        black_box(&photo_counts),
                        black_box(20),
                        &mut rng,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_filtering_pipeline(c: &mut Criterion) {
    let actor = actor();
    let preference = Preference::default_for(&actor.user_id);
    let candidates = create_pool(1000);
    let excluded: Vec<UserId> = (0..200).map(|i| format!("user-{}", i * 5)).collect();

    c.bench_function("filtering_pipeline_1000_candidates", |b| {
        b.iter(|| {
            let query = build_candidate_query(&actor, &preference, excluded.iter().cloned(), 100);
            let filtered: Vec<&Profile> = candidates
                .iter()
                .filter(|p| matches_candidate_query(p, &query))
                .take(query.limit)
                .collect();

            black_box(filtered.len())
        });
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_bounding_box,
    bench_ranking,
    bench_filtering_pipeline
);

criterion_main!(benches);
