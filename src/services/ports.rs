//! Collaborator contracts consumed by the discovery core.
//!
//! Every store the facade talks to is an async trait object, so the
//! Postgres adapter and the in-memory adapter are interchangeable.

use crate::core::quota::{QuotaKind, Tier, TierLimits};
use crate::models::{
    CandidateQuery, DailyLimit, Match, MatchStatus, Photo, Preference, Profile, Swipe, UserId,
    UserPair,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Failure of a collaborator or storage adapter
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a conditional swipe insert
#[derive(Debug, Clone, PartialEq)]
pub enum SwipeInsert {
    Inserted,
    /// A row for the ordered pair already existed
    Conflict(Swipe),
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;

    /// Profiles for the given ids, unknown ids are skipped
    async fn find_profiles(&self, user_ids: &[UserId]) -> StoreResult<Vec<Profile>>;

    /// Insert a minimal profile unless one exists, returning the stored row
    async fn create_default_profile(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<Profile>;
}

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// At most `query.limit` profiles passing every hard filter
    async fn fetch_candidates(&self, query: &CandidateQuery) -> StoreResult<Vec<Profile>>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn get_user_photos(&self, user_id: &str) -> StoreResult<Vec<Photo>>;

    async fn get_primary_photo(&self, user_id: &str) -> StoreResult<Option<Photo>>;

    /// Number of active photos per user, users without photos may be absent
    async fn active_photo_counts(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, usize>>;
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// True when a block edge exists in either direction
    async fn is_blocked(&self, user_id: &str, target_id: &str) -> StoreResult<bool>;

    /// Everyone the user blocked or was blocked by
    async fn blocked_user_ids(&self, user_id: &str) -> StoreResult<HashSet<UserId>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get_or_create_default(&self, user_id: &str) -> StoreResult<Preference>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Current tier, `Free` when the user has no subscription
    async fn tier_of(&self, user_id: &str) -> StoreResult<Tier>;
}

#[async_trait]
pub trait SwipeLedger: Send + Sync {
    async fn find_swipe(&self, actor_id: &str, target_id: &str) -> StoreResult<Option<Swipe>>;

    /// Insert unless the ordered pair already has a row
    async fn insert_swipe(&self, swipe: &Swipe) -> StoreResult<SwipeInsert>;

    /// Replace `expected` with `updated` only if the stored row still has
    /// the expected action and super-like flag
    async fn update_swipe(&self, expected: &Swipe, updated: &Swipe) -> StoreResult<bool>;

    async fn swiped_target_ids(&self, actor_id: &str) -> StoreResult<HashSet<UserId>>;

    /// Newest first
    async fn recent_swipes(&self, actor_id: &str, limit: usize) -> StoreResult<Vec<Swipe>>;

    /// Like rows pointing at `target_id`, newest first
    async fn likers_of(&self, target_id: &str) -> StoreResult<Vec<Swipe>>;

    /// Turn the like rows between the two users, in both directions, into
    /// passes. Returns how many rows changed.
    async fn release_likes(&self, pair: &UserPair) -> StoreResult<u64>;
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically add one unit of `kind` for the day unless the counter
    /// already reached `ceiling`. Returns the new count, `None` when full.
    /// `limits` is recorded on the row when it is first created.
    async fn try_reserve(
        &self,
        user_id: &str,
        day: &str,
        kind: QuotaKind,
        ceiling: u32,
        limits: &TierLimits,
    ) -> StoreResult<Option<u32>>;

    /// Give back one unit, never below zero
    async fn refund(&self, user_id: &str, day: &str, kind: QuotaKind) -> StoreResult<()>;

    async fn usage(&self, user_id: &str, day: &str) -> StoreResult<Option<DailyLimit>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Insert only if the pair has no active match. Returns false when
    /// another active match already exists.
    async fn insert_active(&self, record: &Match) -> StoreResult<bool>;

    async fn find_active(&self, pair: &UserPair) -> StoreResult<Option<Match>>;

    async fn find_by_id(&self, match_id: Uuid) -> StoreResult<Option<Match>>;

    /// Move an active match to a terminal status. `None` when the match is
    /// missing or no longer active.
    async fn transition_status(
        &self,
        match_id: Uuid,
        to: MatchStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Match>>;

    /// Active matches of a user, newest first
    async fn active_matches_for(&self, user_id: &str, limit: usize, offset: usize) -> StoreResult<Vec<Match>>;

    async fn count_active_for(&self, user_id: &str) -> StoreResult<usize>;
}

/// Sent to the target of a like or superlike
#[derive(Debug, Clone, Serialize)]
pub struct LikeNotification {
    #[serde(rename = "targetId")]
    pub target_id: UserId,
    #[serde(rename = "likerId")]
    pub liker_id: UserId,
    #[serde(rename = "likerName")]
    pub liker_name: String,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
    #[serde(rename = "isSuperLike")]
    pub is_super_like: bool,
}

/// Sent to both sides of a new match
#[derive(Debug, Clone, Serialize)]
pub struct MatchNotification {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "targetUserId")]
    pub target_user_id: UserId,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Dispatcher rejected notification with status {0}")]
    Rejected(u16),
}

/// Fire-and-forget delivery; callers log failures and move on
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_like(&self, notification: &LikeNotification) -> Result<(), NotifyError>;

    async fn notify_match(&self, notification: &MatchNotification) -> Result<(), NotifyError>;
}
