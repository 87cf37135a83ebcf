use crate::core::{distance::distance_between, scoring::{score_candidate, ScoringContext}};
use crate::models::{Profile, ScoredCandidate, ScoringWeights, UserId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

/// Share of the sorted pool that gets shuffled before truncation
pub const DEFAULT_SHUFFLE_FRACTION: f64 = 0.2;

/// Result of ranking one candidate pool
#[derive(Debug)]
pub struct RankResult {
    pub ranked: Vec<ScoredCandidate>,
    pub pool_size: usize,
}

/// Ranks a candidate pool that already passed the hard filters
///
/// # Pipeline Stages
/// 1. Score every candidate (five sub-scores, weighted total)
/// 2. Sort descending by total, ties keep pool order
/// 3. Shuffle the top ⌈fraction⌉ of the sorted list
/// 4. Truncate to the requested count
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: ScoringWeights,
    shuffle_fraction: f64,
}

impl Ranker {
    pub fn new(weights: ScoringWeights, shuffle_fraction: f64) -> Self {
        Self {
            weights,
            shuffle_fraction: shuffle_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default(), DEFAULT_SHUFFLE_FRACTION)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Number of leading entries that get shuffled for a pool of `len`
    pub fn shuffle_window(&self, len: usize) -> usize {
        ((len as f64) * self.shuffle_fraction).ceil() as usize
    }

    /// Score, sort, shuffle the top quantile and truncate
    ///
    /// # Arguments
    /// * `ctx` - Actor-side scoring inputs
    /// * `candidates` - Pool from the candidate repository
    /// * `photo_counts` - Active photo count per candidate, missing = 0
    /// * `limit` - Maximum number of candidates to return
    /// * `rng` - Source of randomness for the top-quantile shuffle
    pub fn rank<R: Rng + ?Sized>(
        &self,
        ctx: &ScoringContext,
        candidates: Vec<Profile>,
        photo_counts: &HashMap<UserId, usize>,
        limit: usize,
        rng: &mut R,
    ) -> RankResult {
        let pool_size = candidates.len();

        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|profile| {
                let photos = photo_counts.get(&profile.user_id).copied().unwrap_or(0);
                let breakdown = score_candidate(ctx, &profile, photos, &self.weights);
                let distance_km = match (ctx.location, profile.location) {
                    (Some(a), Some(b)) => Some(distance_between(&a, &b)),
                    _ => None,
                };
                ScoredCandidate { profile, breakdown, distance_km }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.breakdown
                .total
                .partial_cmp(&a.breakdown.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let window = self.shuffle_window(scored.len());
        scored[..window].shuffle(rng);

        scored.truncate(limit);

        RankResult { ranked: scored, pool_size }
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::with_default_weights()
    }
}
