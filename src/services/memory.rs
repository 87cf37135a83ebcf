use crate::core::filters::matches_candidate_query;
use crate::core::quota::{QuotaKind, Tier, TierLimits};
use crate::models::{
    CandidateQuery, DailyLimit, Match, MatchStatus, Photo, Preference, Profile, Swipe, SwipeAction, UserId,
    UserPair,
};
use crate::services::ports::{
    BlockStore, CandidateRepository, MatchStore, PhotoStore, PreferenceStore, ProfileStore,
    QuotaStore, StoreResult, SubscriptionStore, SwipeInsert, SwipeLedger,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    photos: HashMap<UserId, Vec<Photo>>,
    preferences: HashMap<UserId, Preference>,
    /// Directed (blocker, blocked) edges
    blocks: HashSet<(UserId, UserId)>,
    tiers: HashMap<UserId, Tier>,
    swipes: HashMap<(UserId, UserId), Swipe>,
    daily_limits: HashMap<(UserId, String), DailyLimit>,
    matches: HashMap<Uuid, Match>,
}

/// In-process store implementing every collaborator contract
///
/// All tables sit behind one lock and each conditional write holds the
/// write guard for its whole check-and-set, which gives it the same
/// atomicity as the single-statement SQL writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_profile(&self, profile: Profile) {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.user_id.clone(), profile);
    }

    pub async fn add_photo(&self, photo: Photo) {
        let mut tables = self.tables.write().await;
        tables.photos.entry(photo.user_id.clone()).or_default().push(photo);
    }

    pub async fn set_preference(&self, preference: Preference) {
        let mut tables = self.tables.write().await;
        tables.preferences.insert(preference.user_id.clone(), preference);
    }

    pub async fn block(&self, blocker_id: &str, blocked_id: &str) {
        let mut tables = self.tables.write().await;
        tables.blocks.insert((blocker_id.to_string(), blocked_id.to_string()));
    }

    pub async fn set_tier(&self, user_id: &str, tier: Tier) {
        let mut tables = self.tables.write().await;
        tables.tiers.insert(user_id.to_string(), tier);
    }

    /// Number of swipe rows across all users
    pub async fn swipe_count(&self) -> usize {
        self.tables.read().await.swipes.len()
    }

    /// Every match ever recorded for a pair, any status
    pub async fn matches_for_pair(&self, pair: &UserPair) -> Vec<Match> {
        let tables = self.tables.read().await;
        let mut found: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| &m.pair() == pair)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.matched_at);
        found
    }
}

fn counter(limit: &mut DailyLimit, kind: QuotaKind) -> &mut u32 {
    match kind {
        QuotaKind::Likes => &mut limit.likes_count,
        QuotaKind::SuperLikes => &mut limit.super_likes_count,
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> StoreResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    async fn create_default_profile(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<Profile> {
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::minimal(user_id, now));
        Ok(profile.clone())
    }
}

#[async_trait]
impl CandidateRepository for MemoryStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> StoreResult<Vec<Profile>> {
        let tables = self.tables.read().await;
        let mut pool: Vec<Profile> = tables
            .profiles
            .values()
            .filter(|p| matches_candidate_query(p, query))
            .cloned()
            .collect();
        // Deterministic cap
        pool.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        pool.truncate(query.limit);
        Ok(pool)
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn get_user_photos(&self, user_id: &str) -> StoreResult<Vec<Photo>> {
        let tables = self.tables.read().await;
        let mut photos = tables.photos.get(user_id).cloned().unwrap_or_default();
        photos.sort_by_key(|p| p.order);
        Ok(photos)
    }

    async fn get_primary_photo(&self, user_id: &str) -> StoreResult<Option<Photo>> {
        let tables = self.tables.read().await;
        Ok(tables
            .photos
            .get(user_id)
            .and_then(|photos| photos.iter().find(|p| p.is_primary && p.is_active))
            .cloned())
    }

    async fn active_photo_counts(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, usize>> {
        let tables = self.tables.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                let count = tables.photos.get(id)?.iter().filter(|p| p.is_active).count();
                Some((id.clone(), count))
            })
            .collect())
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn is_blocked(&self, user_id: &str, target_id: &str) -> StoreResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.blocks.contains(&(user_id.to_string(), target_id.to_string()))
            || tables.blocks.contains(&(target_id.to_string(), user_id.to_string())))
    }

    async fn blocked_user_ids(&self, user_id: &str) -> StoreResult<HashSet<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .blocks
            .iter()
            .filter_map(|(blocker, blocked)| {
                if blocker == user_id {
                    Some(blocked.clone())
                } else if blocked == user_id {
                    Some(blocker.clone())
                } else {
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get_or_create_default(&self, user_id: &str) -> StoreResult<Preference> {
        let mut tables = self.tables.write().await;
        let preference = tables
            .preferences
            .entry(user_id.to_string())
            .or_insert_with(|| Preference::default_for(user_id));
        Ok(preference.clone())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn tier_of(&self, user_id: &str) -> StoreResult<Tier> {
        Ok(self.tables.read().await.tiers.get(user_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl SwipeLedger for MemoryStore {
    async fn find_swipe(&self, actor_id: &str, target_id: &str) -> StoreResult<Option<Swipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .swipes
            .get(&(actor_id.to_string(), target_id.to_string()))
            .cloned())
    }

    async fn insert_swipe(&self, swipe: &Swipe) -> StoreResult<SwipeInsert> {
        let mut tables = self.tables.write().await;
        let key = (swipe.actor_id.clone(), swipe.target_id.clone());
        if let Some(existing) = tables.swipes.get(&key) {
            return Ok(SwipeInsert::Conflict(existing.clone()));
        }
        tables.swipes.insert(key, swipe.clone());
        Ok(SwipeInsert::Inserted)
    }

    async fn release_likes(&self, pair: &UserPair) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut released = 0;
        for key in [
            (pair.first().to_string(), pair.second().to_string()),
            (pair.second().to_string(), pair.first().to_string()),
        ] {
            if let Some(swipe) = tables.swipes.get_mut(&key).filter(|s| s.is_like()) {
                swipe.action = SwipeAction::Pass;
                swipe.is_super_like = false;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn update_swipe(&self, expected: &Swipe, updated: &Swipe) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let key = (expected.actor_id.clone(), expected.target_id.clone());
        match tables.swipes.get_mut(&key) {
            Some(current)
                if current.action == expected.action
                    && current.is_super_like == expected.is_super_like =>
            {
                *current = updated.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn swiped_target_ids(&self, actor_id: &str) -> StoreResult<HashSet<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .swipes
            .keys()
            .filter(|(actor, _)| actor == actor_id)
            .map(|(_, target)| target.clone())
            .collect())
    }

    async fn recent_swipes(&self, actor_id: &str, limit: usize) -> StoreResult<Vec<Swipe>> {
        let tables = self.tables.read().await;
        let mut swipes: Vec<Swipe> = tables
            .swipes
            .values()
            .filter(|s| s.actor_id == actor_id)
            .cloned()
            .collect();
        swipes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        swipes.truncate(limit);
        Ok(swipes)
    }

    async fn likers_of(&self, target_id: &str) -> StoreResult<Vec<Swipe>> {
        let tables = self.tables.read().await;
        let mut likes: Vec<Swipe> = tables
            .swipes
            .values()
            .filter(|s| s.target_id == target_id && s.is_like())
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(likes)
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn try_reserve(
        &self,
        user_id: &str,
        day: &str,
        kind: QuotaKind,
        ceiling: u32,
        limits: &TierLimits,
    ) -> StoreResult<Option<u32>> {
        let mut tables = self.tables.write().await;
        let row = tables
            .daily_limits
            .entry((user_id.to_string(), day.to_string()))
            .or_insert_with(|| DailyLimit {
                user_id: user_id.to_string(),
                day: day.to_string(),
                likes_count: 0,
                super_likes_count: 0,
                max_likes: limits.likes,
                max_super_likes: limits.super_likes,
            });

        let used = counter(row, kind);
        if *used >= ceiling {
            return Ok(None);
        }
        *used += 1;
        Ok(Some(*used))
    }

    async fn refund(&self, user_id: &str, day: &str, kind: QuotaKind) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(row) = tables
            .daily_limits
            .get_mut(&(user_id.to_string(), day.to_string()))
        {
            let used = counter(row, kind);
            *used = used.saturating_sub(1);
        }
        Ok(())
    }

    async fn usage(&self, user_id: &str, day: &str) -> StoreResult<Option<DailyLimit>> {
        let tables = self.tables.read().await;
        Ok(tables
            .daily_limits
            .get(&(user_id.to_string(), day.to_string()))
            .cloned())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn insert_active(&self, record: &Match) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let pair = record.pair();
        let taken = tables
            .matches
            .values()
            .any(|m| m.status == MatchStatus::Active && m.pair() == pair);
        if taken {
            return Ok(false);
        }
        tables.matches.insert(record.id, record.clone());
        Ok(true)
    }

    async fn find_active(&self, pair: &UserPair) -> StoreResult<Option<Match>> {
        let tables = self.tables.read().await;
        Ok(tables
            .matches
            .values()
            .find(|m| m.status == MatchStatus::Active && &m.pair() == pair)
            .cloned())
    }

    async fn find_by_id(&self, match_id: Uuid) -> StoreResult<Option<Match>> {
        Ok(self.tables.read().await.matches.get(&match_id).cloned())
    }

    async fn transition_status(
        &self,
        match_id: Uuid,
        to: MatchStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Match>> {
        let mut tables = self.tables.write().await;
        match tables.matches.get_mut(&match_id) {
            Some(record) if record.status == MatchStatus::Active => {
                record.status = to;
                record.unmatched_at = Some(at);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn active_matches_for(&self, user_id: &str, limit: usize, offset: usize) -> StoreResult<Vec<Match>> {
        let tables = self.tables.read().await;
        let mut active: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| m.status == MatchStatus::Active && m.involves(user_id))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(active.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_active_for(&self, user_id: &str) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .matches
            .values()
            .filter(|m| m.status == MatchStatus::Active && m.involves(user_id))
            .count())
    }
}
