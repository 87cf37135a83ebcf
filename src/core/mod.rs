// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod quota;
pub mod ranking;
pub mod scoring;
pub mod swipe;

pub use distance::{
    calculate_bounding_box, distance_between, haversine_distance, is_within_bounding_box, longitude_ranges,
};
pub use filters::{build_candidate_query, matches_candidate_query};
pub use quota::{day_key, next_reset, QuotaKind, Remaining, Tier, TierLimitTable, TierLimits};
pub use ranking::{RankResult, Ranker};
pub use scoring::{score_candidate, ScoringContext};
pub use swipe::{plan_transition, SwipeIntent, Transition};
