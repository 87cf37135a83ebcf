use crate::error::{DiscoveryError, DiscoveryResult};
use crate::models::{Match, MatchStatus, UserPair};
use crate::services::ports::MatchStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Default number of conditional insert attempts before giving up
pub const DEFAULT_CREATE_ATTEMPTS: u32 = 3;

/// Outcome of [`MatchCoordinator::create_if_absent`]
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCreation {
    pub record: Match,
    /// False when another writer's active match was returned
    pub created: bool,
}

/// Owns the single-active-match-per-pair invariant
///
/// Creation is one atomic conditional insert keyed by the canonical pair.
/// The losing writer of a race reads back the winner's row.
pub struct MatchCoordinator {
    store: Arc<dyn MatchStore>,
    create_attempts: u32,
}

impl MatchCoordinator {
    pub fn new(store: Arc<dyn MatchStore>, create_attempts: u32) -> Self {
        Self {
            store,
            create_attempts: create_attempts.max(1),
        }
    }

    pub async fn find_active(&self, user_a: &str, user_b: &str) -> DiscoveryResult<Option<Match>> {
        Ok(self.store.find_active(&UserPair::new(user_a, user_b)).await?)
    }

    /// Return the active match of the pair, creating it if none exists
    pub async fn create_if_absent(
        &self,
        user_a: &str,
        user_b: &str,
        now: DateTime<Utc>,
    ) -> DiscoveryResult<MatchCreation> {
        let pair = UserPair::new(user_a, user_b);

        for attempt in 1..=self.create_attempts {
            let candidate = Match::active(&pair, now);
            if self.store.insert_active(&candidate).await? {
                tracing::info!(match_id = %candidate.id, pair = %pair, "Match created");
                return Ok(MatchCreation { record: candidate, created: true });
            }

            if let Some(winner) = self.store.find_active(&pair).await? {
                tracing::debug!(match_id = %winner.id, pair = %pair, "Concurrent match creation lost, using winner");
                return Ok(MatchCreation { record: winner, created: false });
            }

            // The winner was ended between our insert and read
            tracing::warn!(pair = %pair, attempt, "Active match vanished during creation, retrying");
        }

        Err(DiscoveryError::Internal(format!(
            "could not settle match creation for {} after {} attempts",
            pair, self.create_attempts
        )))
    }

    /// Match by id, only when the caller is one of its users
    pub async fn get(&self, match_id: Uuid, caller: &str) -> DiscoveryResult<Match> {
        match self.store.find_by_id(match_id).await? {
            Some(record) if record.involves(caller) => Ok(record),
            _ => Err(DiscoveryError::InvalidMatchReference(match_id.to_string())),
        }
    }

    /// End an active match on behalf of one of its users
    pub async fn unmatch(&self, match_id: Uuid, caller: &str, now: DateTime<Utc>) -> DiscoveryResult<Match> {
        let record = self.get(match_id, caller).await?;
        if record.status.is_terminal() {
            return Err(DiscoveryError::InvalidMatchReference(match_id.to_string()));
        }
        self.end(record.id, MatchStatus::Unmatched, now).await
    }

    /// End the active match between two users
    pub async fn unmatch_user(&self, user_id: &str, target_id: &str, now: DateTime<Utc>) -> DiscoveryResult<Match> {
        let pair = UserPair::new(user_id, target_id);
        let record = self
            .store
            .find_active(&pair)
            .await?
            .ok_or_else(|| DiscoveryError::InvalidMatchReference(pair.to_string()))?;
        self.end(record.id, MatchStatus::Unmatched, now).await
    }

    /// Called when a block is placed: the pair's active match becomes blocked
    pub async fn mark_blocked(&self, user_id: &str, target_id: &str, now: DateTime<Utc>) -> DiscoveryResult<Option<Match>> {
        let pair = UserPair::new(user_id, target_id);
        let Some(record) = self.store.find_active(&pair).await? else {
            return Ok(None);
        };
        let blocked = self
            .store
            .transition_status(record.id, MatchStatus::Blocked, now)
            .await?;
        if let Some(m) = &blocked {
            tracing::info!(match_id = %m.id, pair = %pair, "Match blocked");
        }
        Ok(blocked)
    }

    /// One page of the user's active matches plus the total count
    pub async fn list(&self, user_id: &str, page: u32, limit: u32) -> DiscoveryResult<(Vec<Match>, usize)> {
        let limit = limit.max(1) as usize;
        let offset = (page.max(1) as usize - 1) * limit;
        let records = self.store.active_matches_for(user_id, limit, offset).await?;
        let total = self.store.count_active_for(user_id).await?;
        Ok((records, total))
    }

    async fn end(&self, match_id: Uuid, to: MatchStatus, now: DateTime<Utc>) -> DiscoveryResult<Match> {
        let ended = self
            .store
            .transition_status(match_id, to, now)
            .await?
            .ok_or_else(|| DiscoveryError::InvalidMatchReference(match_id.to_string()))?;
        tracing::info!(match_id = %ended.id, status = ?ended.status, "Match ended");
        Ok(ended)
    }
}
