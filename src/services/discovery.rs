use crate::core::filters::build_candidate_query;
use crate::core::quota::{QuotaKind, TierLimitTable};
use crate::core::ranking::{RankResult, Ranker, DEFAULT_SHUFFLE_FRACTION};
use crate::core::scoring::ScoringContext;
use crate::core::swipe::{plan_transition, SwipeIntent, Transition};
use crate::error::{ActedReason, DiscoveryError, DiscoveryResult};
use crate::models::responses::display_distance;
use crate::models::{
    CardsResponse, LikerEntry, Match, MatchCard, MatchDetail, MatchListResponse, MatchOutcome,
    MatchSnapshot, MatchStatusResponse, PassOutcome, Preference, Profile, PublicProfile,
    QuotaStatus, ScoringWeights, Swipe, SwipeOutcome, UnmatchResponse, UserId, UserPair,
};
use crate::services::matches::{MatchCoordinator, DEFAULT_CREATE_ATTEMPTS};
use crate::services::ports::{
    BlockStore, CandidateRepository, LikeNotification, MatchNotification, MatchStore, Notifier,
    PhotoStore, PreferenceStore, ProfileStore, QuotaStore, SubscriptionStore, SwipeInsert,
    SwipeLedger,
};
use crate::services::quota::{QuotaTracker, Reservation};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// How often a swipe write is re-planned after losing a race on its row
const SWIPE_WRITE_ATTEMPTS: u32 = 3;

/// Tunables of the discovery facade
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Candidate pool fetched per request before scoring
    pub pool_limit: usize,
    /// Recent swipe targets used for the diversity score
    pub recent_swipe_window: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    /// Location score radius when the preference has none
    pub default_max_distance_km: f64,
    pub shuffle_fraction: f64,
    pub weights: ScoringWeights,
    pub tiers: TierLimitTable,
    pub create_attempts: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            pool_limit: 100,
            recent_swipe_window: 20,
            default_limit: 10,
            max_limit: 50,
            default_max_distance_km: Preference::DEFAULT_MAX_DISTANCE_KM,
            shuffle_fraction: DEFAULT_SHUFFLE_FRACTION,
            weights: ScoringWeights::default(),
            tiers: TierLimitTable::default(),
            create_attempts: DEFAULT_CREATE_ATTEMPTS,
        }
    }
}

/// Every collaborator the facade talks to
#[derive(Clone)]
pub struct Stores {
    pub profiles: Arc<dyn ProfileStore>,
    pub candidates: Arc<dyn CandidateRepository>,
    pub photos: Arc<dyn PhotoStore>,
    pub blocks: Arc<dyn BlockStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub swipes: Arc<dyn SwipeLedger>,
    pub quotas: Arc<dyn QuotaStore>,
    pub matches: Arc<dyn MatchStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Stores {
    /// All collaborators served by one adapter
    pub fn from_store<S>(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self
    where
        S: ProfileStore
            + CandidateRepository
            + PhotoStore
            + BlockStore
            + PreferenceStore
            + SubscriptionStore
            + SwipeLedger
            + QuotaStore
            + MatchStore
            + 'static,
    {
        Self {
            profiles: store.clone(),
            candidates: store.clone(),
            photos: store.clone(),
            blocks: store.clone(),
            preferences: store.clone(),
            subscriptions: store.clone(),
            swipes: store.clone(),
            quotas: store.clone(),
            matches: store,
            notifier,
        }
    }

    /// Replace the photo store, e.g. with a cached one
    pub fn with_photos(mut self, photos: Arc<dyn PhotoStore>) -> Self {
        self.photos = photos;
        self
    }
}

/// Orchestrates discovery, swipes and matches
///
/// # Swipe flow
/// 1. Reject self-actions and unknown targets
/// 2. Likes: reject blocked pairs
/// 3. Plan the transition from the stored swipe row
/// 4. Reserve quota for transitions that cost a unit
/// 5. Conditional write; a lost race refunds and re-plans
/// 6. Likes: reciprocity check, match creation, notifications
pub struct DiscoveryService {
    stores: Stores,
    ranker: Ranker,
    quota: QuotaTracker,
    matches: MatchCoordinator,
    options: DiscoveryOptions,
}

impl DiscoveryService {
    pub fn new(stores: Stores, options: DiscoveryOptions) -> Self {
        let ranker = Ranker::new(options.weights, options.shuffle_fraction);
        let quota = QuotaTracker::new(
            stores.quotas.clone(),
            stores.subscriptions.clone(),
            options.tiers.clone(),
        );
        let matches = MatchCoordinator::new(stores.matches.clone(), options.create_attempts);

        Self {
            stores,
            ranker,
            quota,
            matches,
            options,
        }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    // ---------------------------------------------------------------
    // Discovery
    // ---------------------------------------------------------------

    /// Ranked cards for `user_id`, excluding everyone already swiped,
    /// blocked in either direction, or listed in `exclude`
    pub async fn next_cards(
        &self,
        user_id: &str,
        limit: Option<usize>,
        exclude: Vec<UserId>,
    ) -> DiscoveryResult<CardsResponse> {
        let now = Utc::now();
        let limit = limit
            .unwrap_or(self.options.default_limit)
            .clamp(1, self.options.max_limit.max(1));

        let actor = self.actor_profile(user_id, now).await?;
        let preference = self.stores.preferences.get_or_create_default(user_id).await?;

        let mut excluded = self.stores.swipes.swiped_target_ids(user_id).await?;
        excluded.extend(self.stores.blocks.blocked_user_ids(user_id).await?);
        excluded.extend(exclude);

        let query = build_candidate_query(&actor, &preference, excluded, self.options.pool_limit);
        let pool = self.stores.candidates.fetch_candidates(&query).await?;

        let recent_ids: Vec<UserId> = self
            .stores
            .swipes
            .recent_swipes(user_id, self.options.recent_swipe_window)
            .await?
            .into_iter()
            .map(|s| s.target_id)
            .collect();
        let recent_targets = self.stores.profiles.find_profiles(&recent_ids).await?;

        let pool_ids: Vec<UserId> = pool.iter().map(|p| p.user_id.clone()).collect();
        let photo_counts = self.stores.photos.active_photo_counts(&pool_ids).await?;

        let max_distance_km = preference
            .max_distance_km
            .unwrap_or(self.options.default_max_distance_km);
        let ctx = ScoringContext::new(&actor, max_distance_km, &recent_targets, now);

        let RankResult { ranked, pool_size } = {
            let mut rng = rand::thread_rng();
            self.ranker.rank(&ctx, pool, &photo_counts, limit, &mut rng)
        };

        let mut cards = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let photos = self.stores.photos.get_user_photos(&candidate.profile.user_id).await?;
            cards.push(MatchCard {
                profile: PublicProfile::from_profile(&candidate.profile, &photos),
                distance_km: candidate.distance_km.map(display_distance),
                score: candidate.breakdown,
            });
        }

        tracing::info!(user_id, pool_size, returned = cards.len(), "Served discovery cards");

        Ok(CardsResponse {
            has_more: pool_size > cards.len(),
            cards,
            pool_size,
        })
    }

    /// Best single card, `None` when the pool is empty
    pub async fn next_card(&self, user_id: &str) -> DiscoveryResult<Option<MatchCard>> {
        let response = self.next_cards(user_id, Some(1), Vec::new()).await?;
        Ok(response.cards.into_iter().next())
    }

    // ---------------------------------------------------------------
    // Swipes
    // ---------------------------------------------------------------

    pub async fn like(&self, actor_id: &str, target_id: &str, score: Option<f64>) -> DiscoveryResult<SwipeOutcome> {
        self.like_with(actor_id, target_id, SwipeIntent::Like, score).await
    }

    pub async fn superlike(&self, actor_id: &str, target_id: &str, score: Option<f64>) -> DiscoveryResult<SwipeOutcome> {
        self.like_with(actor_id, target_id, SwipeIntent::SuperLike, score).await
    }

    pub async fn pass(&self, actor_id: &str, target_id: &str, score: Option<f64>) -> DiscoveryResult<PassOutcome> {
        let now = Utc::now();
        self.load_target(actor_id, target_id).await?;

        if self.matches.find_active(actor_id, target_id).await?.is_some() {
            return Err(DiscoveryError::AlreadyActed(ActedReason::ActiveMatch));
        }

        let (transition, _) = self
            .record_swipe(actor_id, target_id, SwipeIntent::Pass, score, now)
            .await?;

        tracing::info!(actor_id, target_id, recorded = transition.writes(), "Pass recorded");
        Ok(PassOutcome {
            action: SwipeIntent::Pass,
            already_recorded: !transition.writes(),
        })
    }

    async fn like_with(
        &self,
        actor_id: &str,
        target_id: &str,
        intent: SwipeIntent,
        score: Option<f64>,
    ) -> DiscoveryResult<SwipeOutcome> {
        let now = Utc::now();
        let target = self.load_target(actor_id, target_id).await?;

        // Checked on every like, including repeats of an existing one
        if self.stores.blocks.is_blocked(actor_id, target_id).await? {
            tracing::info!(actor_id, target_id, "Like rejected, pair is blocked");
            return Err(DiscoveryError::Blocked);
        }

        let (transition, reservation) = self
            .record_swipe(actor_id, target_id, intent, score, now)
            .await?;

        let remaining = match &reservation {
            Some(reservation) => reservation.remaining,
            None => self.quota.peek(actor_id, quota_kind(intent), now).await?,
        };

        let outcome = self
            .resolve_reciprocity(actor_id, &target, intent, transition, now)
            .await?;

        tracing::info!(
            actor_id,
            target_id,
            action = ?intent,
            recorded = transition.writes(),
            matched = outcome.is_matched(),
            "Like recorded"
        );

        Ok(SwipeOutcome {
            action: intent,
            outcome,
            remaining,
            already_recorded: !transition.writes(),
        })
    }

    /// Plan, reserve and write until the write lands on the row it was
    /// planned against
    async fn record_swipe(
        &self,
        actor_id: &str,
        target_id: &str,
        intent: SwipeIntent,
        score: Option<f64>,
        now: DateTime<Utc>,
    ) -> DiscoveryResult<(Transition, Option<Reservation>)> {
        for attempt in 1..=SWIPE_WRITE_ATTEMPTS {
            let existing = self.stores.swipes.find_swipe(actor_id, target_id).await?;
            let transition = plan_transition(existing.as_ref(), intent)?;

            let reservation = match transition.quota_cost() {
                Some(kind) => Some(self.quota.check_and_reserve(actor_id, kind, now).await?),
                None => None,
            };

            match self
                .write_transition(transition, existing.as_ref(), actor_id, target_id, score, now)
                .await
            {
                Ok(true) => return Ok((transition, reservation)),
                Ok(false) => {
                    tracing::debug!(actor_id, target_id, attempt, "Swipe row changed concurrently, re-planning");
                    self.release(reservation.as_ref()).await;
                }
                Err(e) => {
                    self.release(reservation.as_ref()).await;
                    return Err(e);
                }
            }
        }

        Err(DiscoveryError::Internal(format!(
            "swipe {} -> {} kept conflicting after {} attempts",
            actor_id, target_id, SWIPE_WRITE_ATTEMPTS
        )))
    }

    /// False when the row no longer matches what the transition was planned on
    async fn write_transition(
        &self,
        transition: Transition,
        existing: Option<&Swipe>,
        actor_id: &str,
        target_id: &str,
        score: Option<f64>,
        now: DateTime<Utc>,
    ) -> DiscoveryResult<bool> {
        let Some(updated) = transition.apply(existing, actor_id, target_id, score, now) else {
            return Ok(true);
        };

        match (transition, existing) {
            (Transition::Insert { .. }, _) => Ok(matches!(
                self.stores.swipes.insert_swipe(&updated).await?,
                SwipeInsert::Inserted
            )),
            (_, Some(expected)) => Ok(self.stores.swipes.update_swipe(expected, &updated).await?),
            (_, None) => Ok(false),
        }
    }

    async fn release(&self, reservation: Option<&Reservation>) {
        if let Some(reservation) = reservation {
            if let Err(e) = self.quota.refund(reservation).await {
                tracing::warn!(user_id = %reservation.user_id, "Failed to refund quota unit: {}", e);
            }
        }
    }

    async fn resolve_reciprocity(
        &self,
        actor_id: &str,
        target: &Profile,
        intent: SwipeIntent,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> DiscoveryResult<MatchOutcome> {
        let target_id = target.user_id.as_str();
        let reciprocal = self.stores.swipes.find_swipe(target_id, actor_id).await?;

        if !reciprocal.as_ref().is_some_and(Swipe::is_like) {
            if transition.writes() {
                self.dispatch_like(actor_id, target_id, intent == SwipeIntent::SuperLike);
            }
            return Ok(MatchOutcome::NoMatch);
        }

        let record = match self.matches.find_active(actor_id, target_id).await? {
            Some(existing) => existing,
            // A repeated like only reports an existing match
            None if !transition.writes() => return Ok(MatchOutcome::NoMatch),
            None => {
                let creation = self.matches.create_if_absent(actor_id, target_id, now).await?;
                if creation.created {
                    self.dispatch_match(&creation.record);
                }
                creation.record
            }
        };

        let photos = self.stores.photos.get_user_photos(target_id).await?;
        Ok(MatchOutcome::Matched(MatchSnapshot {
            match_id: record.id,
            matched_at: record.matched_at,
            target: PublicProfile::from_profile(target, &photos),
        }))
    }

    fn dispatch_like(&self, liker_id: &str, target_id: &str, is_super_like: bool) {
        let profiles = self.stores.profiles.clone();
        let photos = self.stores.photos.clone();
        let notifier = self.stores.notifier.clone();
        let liker_id = liker_id.to_string();
        let target_id = target_id.to_string();

        tokio::spawn(async move {
            let liker_name = match profiles.find_profile(&liker_id).await {
                Ok(Some(profile)) => profile.name_or_id().to_string(),
                _ => liker_id.clone(),
            };
            let photo_url = match photos.get_primary_photo(&liker_id).await {
                Ok(photo) => photo.map(|p| p.url),
                Err(e) => {
                    tracing::debug!(user_id = %liker_id, "No photo for like notification: {}", e);
                    None
                }
            };

            let notification = LikeNotification {
                target_id,
                liker_id,
                liker_name,
                photo_url,
                is_super_like,
            };
            if let Err(e) = notifier.notify_like(&notification).await {
                tracing::warn!(
                    liker_id = %notification.liker_id,
                    target_id = %notification.target_id,
                    "Like notification failed: {}",
                    e
                );
            }
        });
    }

    fn dispatch_match(&self, record: &Match) {
        let notifier = self.stores.notifier.clone();
        let notification = MatchNotification {
            match_id: record.id,
            user_id: record.user_id.clone(),
            target_user_id: record.target_user_id.clone(),
            matched_at: record.matched_at,
        };

        tokio::spawn(async move {
            if let Err(e) = notifier.notify_match(&notification).await {
                tracing::warn!(match_id = %notification.match_id, "Match notification failed: {}", e);
            }
        });
    }

    // ---------------------------------------------------------------
    // Matches
    // ---------------------------------------------------------------

    pub async fn unmatch(&self, match_id: Uuid, caller: &str) -> DiscoveryResult<UnmatchResponse> {
        let ended = self.matches.unmatch(match_id, caller, Utc::now()).await?;
        self.release_pair(&ended).await
    }

    pub async fn unmatch_user(&self, user_id: &str, target_id: &str) -> DiscoveryResult<UnmatchResponse> {
        let ended = self.matches.unmatch_user(user_id, target_id, Utc::now()).await?;
        self.release_pair(&ended).await
    }

    /// Both likes of an ended match become passes, so matching again takes
    /// a fresh like from each side
    async fn release_pair(&self, ended: &Match) -> DiscoveryResult<UnmatchResponse> {
        let pair = UserPair::new(&ended.user_id, &ended.target_user_id);
        let released = self.stores.swipes.release_likes(&pair).await?;
        tracing::debug!(match_id = %ended.id, pair = %pair, released, "Released likes of ended match");
        Ok(UnmatchResponse {
            success: true,
            match_id: ended.id,
        })
    }

    /// Hook for the blocking collaborator
    pub async fn mark_blocked(&self, user_id: &str, target_id: &str) -> DiscoveryResult<Option<Match>> {
        self.matches.mark_blocked(user_id, target_id, Utc::now()).await
    }

    pub async fn list_matches(&self, user_id: &str, page: u32, limit: u32) -> DiscoveryResult<MatchListResponse> {
        let now = Utc::now();
        let (records, total) = self.matches.list(user_id, page, limit).await?;

        let other_ids: Vec<UserId> = records
            .iter()
            .map(|m| m.other_party(user_id).to_string())
            .collect();
        let mut profiles: HashMap<UserId, Profile> = self
            .stores
            .profiles
            .find_profiles(&other_ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        let mut matches = Vec::with_capacity(records.len());
        for record in records {
            let other_id = record.other_party(user_id).to_string();
            let profile = profiles
                .remove(&other_id)
                .unwrap_or_else(|| Profile::minimal(&other_id, now));
            matches.push(self.detail(&record, &profile).await?);
        }

        Ok(MatchListResponse {
            matches,
            total,
            page: page.max(1),
            limit,
        })
    }

    pub async fn get_match(&self, match_id: Uuid, caller: &str) -> DiscoveryResult<MatchDetail> {
        let record = self.matches.get(match_id, caller).await?;
        let other_id = record.other_party(caller);
        let profile = self
            .stores
            .profiles
            .find_profile(other_id)
            .await?
            .unwrap_or_else(|| Profile::minimal(other_id, Utc::now()));
        self.detail(&record, &profile).await
    }

    pub async fn match_status(&self, user_id: &str, target_id: &str) -> DiscoveryResult<MatchStatusResponse> {
        let active = self.matches.find_active(user_id, target_id).await?;
        let user_liked = self
            .stores
            .swipes
            .find_swipe(user_id, target_id)
            .await?
            .is_some_and(|s| s.is_like());
        let target_liked = self
            .stores
            .swipes
            .find_swipe(target_id, user_id)
            .await?
            .is_some_and(|s| s.is_like());

        Ok(MatchStatusResponse {
            matched: active.is_some(),
            match_id: active.map(|m| m.id),
            user_liked,
            target_liked,
        })
    }

    /// Likes on `user_id` the user has not answered yet, blocked users excluded
    pub async fn likers(&self, user_id: &str) -> DiscoveryResult<Vec<LikerEntry>> {
        let likes = self.stores.swipes.likers_of(user_id).await?;
        let blocked = self.stores.blocks.blocked_user_ids(user_id).await?;
        let answered = self.stores.swipes.swiped_target_ids(user_id).await?;

        let pending: Vec<Swipe> = likes
            .into_iter()
            .filter(|s| !blocked.contains(&s.actor_id) && !answered.contains(&s.actor_id))
            .collect();
        let ids: Vec<UserId> = pending.iter().map(|s| s.actor_id.clone()).collect();
        let profiles: HashMap<UserId, Profile> = self
            .stores
            .profiles
            .find_profiles(&ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        let mut entries = Vec::with_capacity(pending.len());
        for like in pending {
            let Some(profile) = profiles.get(&like.actor_id) else {
                continue;
            };
            let photos = self.stores.photos.get_user_photos(&like.actor_id).await?;
            entries.push(LikerEntry {
                profile: PublicProfile::from_profile(profile, &photos),
                is_super_like: like.is_super_like,
                liked_at: like.timestamp,
            });
        }
        Ok(entries)
    }

    pub async fn quota_status(&self, user_id: &str) -> DiscoveryResult<QuotaStatus> {
        self.quota.status(user_id, Utc::now()).await
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Recommendation requests never fail because profile creation lagged
    async fn actor_profile(&self, user_id: &str, now: DateTime<Utc>) -> DiscoveryResult<Profile> {
        if let Some(profile) = self.stores.profiles.find_profile(user_id).await? {
            return Ok(profile);
        }
        tracing::info!(user_id, "No profile yet, creating a minimal one");
        Ok(self.stores.profiles.create_default_profile(user_id, now).await?)
    }

    async fn load_target(&self, actor_id: &str, target_id: &str) -> DiscoveryResult<Profile> {
        if actor_id == target_id {
            return Err(DiscoveryError::SelfAction);
        }
        self.stores
            .profiles
            .find_profile(target_id)
            .await?
            .ok_or_else(|| DiscoveryError::TargetNotFound(target_id.to_string()))
    }

    async fn detail(&self, record: &Match, other: &Profile) -> DiscoveryResult<MatchDetail> {
        let photos = self.stores.photos.get_user_photos(&other.user_id).await?;
        Ok(MatchDetail {
            match_id: record.id,
            status: record.status,
            matched_at: record.matched_at,
            unmatched_at: record.unmatched_at,
            other: PublicProfile::from_profile(other, &photos),
        })
    }
}

fn quota_kind(intent: SwipeIntent) -> QuotaKind {
    match intent {
        SwipeIntent::SuperLike => QuotaKind::SuperLikes,
        SwipeIntent::Like | SwipeIntent::Pass => QuotaKind::Likes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quota::{Remaining, Tier};
    use crate::models::{Gender, GeoPoint, Mode, Photo, UserPair};
    use crate::services::memory::MemoryStore;
    use crate::services::ports::NotifyError;
    use async_trait::async_trait;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify_like(&self, _: &LikeNotification) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(500))
        }

        async fn notify_match(&self, _: &MatchNotification) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(500))
        }
    }

    fn profile(user_id: &str, interests: &[&str]) -> Profile {
        Profile {
            user_id: user_id.to_string(),
            display_name: Some(user_id.to_uppercase()),
            age: Some(28),
            gender: Some(Gender::Female),
            mode: Mode::Dating,
            interests: interests.iter().map(|i| i.to_string()).collect(),
            location: Some(GeoPoint::new(106.0, 10.0)),
            bio: Some("hello there".to_string()),
            updated_at: Utc::now(),
        }
    }

    async fn service_with(users: &[&str]) -> (Arc<MemoryStore>, DiscoveryService) {
        let store = Arc::new(MemoryStore::new());
        for user in users {
            store.upsert_profile(profile(user, &["hiking"])).await;
        }
        let stores = Stores::from_store(store.clone(), Arc::new(FailingNotifier));
        (store, DiscoveryService::new(stores, DiscoveryOptions::default()))
    }

    #[tokio::test]
    async fn test_mutual_like_creates_one_match() {
        let (store, service) = service_with(&["alice", "bob"]).await;

        let first = service.like("alice", "bob", None).await.unwrap();
        assert!(!first.matched());
        assert_eq!(first.remaining, Remaining::Limited(29));

        let second = service.like("bob", "alice", None).await.unwrap();
        let snapshot = second.outcome.snapshot().cloned().unwrap();
        assert_eq!(snapshot.target.user_id, "alice");

        // Repeating the like is a no-op that still reports the match
        let repeat = service.like("alice", "bob", None).await.unwrap();
        assert!(repeat.already_recorded);
        assert_eq!(repeat.outcome.snapshot().map(|s| s.match_id), Some(snapshot.match_id));
        assert_eq!(repeat.remaining, Remaining::Limited(29));

        assert_eq!(store.matches_for_pair(&UserPair::new("alice", "bob")).await.len(), 1);
        assert_eq!(store.swipe_count().await, 2);
    }

    #[tokio::test]
    async fn test_self_and_unknown_targets_are_rejected() {
        let (_, service) = service_with(&["alice"]).await;

        assert!(matches!(
            service.like("alice", "alice", None).await,
            Err(DiscoveryError::SelfAction)
        ));
        assert!(matches!(
            service.pass("alice", "ghost", None).await,
            Err(DiscoveryError::TargetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pass_rules() {
        let (_, service) = service_with(&["alice", "bob", "carol"]).await;

        // pass -> like revokes the pass
        service.pass("alice", "bob", None).await.unwrap();
        let liked = service.like("alice", "bob", None).await.unwrap();
        assert!(!liked.already_recorded);

        assert!(matches!(
            service.pass("alice", "bob", None).await,
            Err(DiscoveryError::AlreadyActed(ActedReason::PassAfterLike))
        ));

        service.like("alice", "carol", None).await.unwrap();
        service.like("carol", "alice", None).await.unwrap();
        assert!(matches!(
            service.pass("carol", "alice", None).await,
            Err(DiscoveryError::AlreadyActed(ActedReason::ActiveMatch))
        ));

        let repeat = service.pass("bob", "carol", None).await.unwrap();
        assert!(!repeat.already_recorded);
        assert!(service.pass("bob", "carol", None).await.unwrap().already_recorded);
    }

    #[tokio::test]
    async fn test_blocked_pair_cannot_like() {
        let (store, service) = service_with(&["alice", "bob"]).await;
        service.like("alice", "bob", None).await.unwrap();
        assert_eq!(service.likers("bob").await.unwrap().len(), 1);

        store.block("bob", "alice").await;

        // Rejected even though the like is already on record
        assert!(matches!(
            service.like("alice", "bob", None).await,
            Err(DiscoveryError::Blocked)
        ));
        assert!(service.likers("bob").await.unwrap().is_empty());
        assert!(service.next_cards("alice", None, Vec::new()).await.unwrap().cards.is_empty());
    }

    #[tokio::test]
    async fn test_superlike_needs_paid_tier_and_upgrades_like() {
        let (store, service) = service_with(&["alice", "bob"]).await;

        assert!(matches!(
            service.superlike("alice", "bob", None).await,
            Err(DiscoveryError::TierNotAllowed { feature: "superlike" })
        ));
        assert_eq!(store.swipe_count().await, 0);

        store.set_tier("alice", Tier::Gold).await;
        service.like("alice", "bob", None).await.unwrap();
        let upgraded = service.superlike("alice", "bob", None).await.unwrap();
        assert!(!upgraded.already_recorded);
        assert_eq!(upgraded.remaining, Remaining::Limited(2));

        let again = service.superlike("alice", "bob", None).await.unwrap();
        assert!(again.already_recorded);
        assert_eq!(again.remaining, Remaining::Limited(2));

        let likers = service.likers("bob").await.unwrap();
        assert!(likers[0].is_super_like);
    }

    #[tokio::test]
    async fn test_cards_exclude_swiped_and_lazy_create_actor() {
        let (store, service) = service_with(&["bob", "carol", "dave"]).await;
        store
            .add_photo(Photo {
                id: "p1".to_string(),
                user_id: "bob".to_string(),
                url: "https://cdn.example.com/p1.jpg".to_string(),
                is_primary: true,
                is_active: true,
                order: 0,
            })
            .await;

        // "newcomer" has no profile yet and no location, so no radius filter
        let response = service
            .next_cards("newcomer", Some(10), vec!["dave".to_string()])
            .await
            .unwrap();
        let ids: Vec<&str> = response.cards.iter().map(|c| c.profile.user_id.as_str()).collect();
        assert_eq!(response.pool_size, 2);
        assert!(ids.contains(&"bob") && ids.contains(&"carol"));
        assert!(!response.has_more);
        assert!(store.find_profile("newcomer").await.unwrap().is_some());

        service.pass("newcomer", "bob", None).await.unwrap();
        let next = service.next_card("newcomer").await.unwrap().unwrap();
        assert_ne!(next.profile.user_id, "bob");
    }

    #[tokio::test]
    async fn test_failing_notifier_never_fails_swipes() {
        let (_, service) = service_with(&["alice", "bob"]).await;
        assert!(service.like("alice", "bob", None).await.is_ok());
        assert!(service.like("bob", "alice", None).await.unwrap().matched());
    }

    #[tokio::test]
    async fn test_match_views_and_unmatch() {
        let (_, service) = service_with(&["alice", "bob"]).await;
        service.like("alice", "bob", None).await.unwrap();
        let matched = service.like("bob", "alice", None).await.unwrap();
        let match_id = matched.outcome.snapshot().map(|s| s.match_id).unwrap();

        let status = service.match_status("alice", "bob").await.unwrap();
        assert!(status.matched && status.user_liked && status.target_liked);

        let list = service.list_matches("alice", 1, 20).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.matches[0].other.user_id, "bob");

        let detail = service.get_match(match_id, "bob").await.unwrap();
        assert_eq!(detail.other.user_id, "alice");

        service.unmatch(match_id, "alice").await.unwrap();
        let status = service.match_status("alice", "bob").await.unwrap();
        assert!(!status.matched && !status.user_liked && !status.target_liked);
        assert!(matches!(
            service.unmatch(match_id, "bob").await,
            Err(DiscoveryError::InvalidMatchReference(_))
        ));
    }
}
