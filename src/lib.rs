//! Lume Discovery - candidate discovery, swipes and matches for the Lume dating app
//!
//! The crate ranks candidate profiles for a user, records like / superlike /
//! pass decisions with per-tier daily quotas, and turns mutual likes into
//! exactly one active match per pair.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{distance::haversine_distance, QuotaKind, Ranker, SwipeIntent, Tier, TierLimitTable};
pub use error::{DiscoveryError, DiscoveryResult};
pub use models::{Match, MatchStatus, Profile, ScoringWeights, Swipe};
pub use services::{DiscoveryOptions, DiscoveryService, MemoryStore, PgStore, Stores};
