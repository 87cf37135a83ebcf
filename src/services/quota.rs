use crate::core::quota::{day_key, next_reset, QuotaKind, Remaining, TierLimitTable};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::models::{DailyLimit, QuotaEntry, QuotaStatus};
use crate::services::ports::{QuotaStore, SubscriptionStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A unit taken from a user's daily quota
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub user_id: String,
    pub kind: QuotaKind,
    pub day: String,
    pub remaining: Remaining,
    /// False for unlimited kinds, which never touch the counter
    counted: bool,
}

impl Reservation {
    pub fn is_counted(&self) -> bool {
        self.counted
    }
}

/// Per-user, per-UTC-day like and superlike accounting
///
/// Limits come from an immutable tier table built at startup. The counter
/// check and increment happen in one conditional store write.
pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    subscriptions: Arc<dyn SubscriptionStore>,
    limits: TierLimitTable,
}

impl QuotaTracker {
    pub fn new(
        store: Arc<dyn QuotaStore>,
        subscriptions: Arc<dyn SubscriptionStore>,
        limits: TierLimitTable,
    ) -> Self {
        Self { store, subscriptions, limits }
    }

    pub fn limits(&self) -> &TierLimitTable {
        &self.limits
    }

    /// Take one unit of `kind`, failing without consuming anything when
    /// the daily cap is reached
    pub async fn check_and_reserve(
        &self,
        user_id: &str,
        kind: QuotaKind,
        now: DateTime<Utc>,
    ) -> DiscoveryResult<Reservation> {
        let tier = self.subscriptions.tier_of(user_id).await?;
        let limits = self.limits.limits(tier);
        let day = day_key(now);

        let Some(ceiling) = limits.limit_for(kind) else {
            return Ok(Reservation {
                user_id: user_id.to_string(),
                kind,
                day,
                remaining: Remaining::Unlimited,
                counted: false,
            });
        };

        if ceiling == 0 && kind == QuotaKind::SuperLikes {
            tracing::debug!(user_id, tier = tier.as_str(), "Superlike not available on tier");
            return Err(DiscoveryError::TierNotAllowed { feature: "superlike" });
        }

        match self
            .store
            .try_reserve(user_id, &day, kind, ceiling, &limits)
            .await?
        {
            Some(used) => Ok(Reservation {
                user_id: user_id.to_string(),
                kind,
                day,
                remaining: Remaining::Limited(ceiling.saturating_sub(used)),
                counted: true,
            }),
            None => {
                tracing::info!(user_id, kind = %kind, ceiling, "Daily quota exhausted");
                Err(DiscoveryError::QuotaExhausted {
                    kind,
                    reset_at: next_reset(now),
                })
            }
        }
    }

    /// Return a unit whose action was never recorded
    pub async fn refund(&self, reservation: &Reservation) -> DiscoveryResult<()> {
        if !reservation.counted {
            return Ok(());
        }
        self.store
            .refund(&reservation.user_id, &reservation.day, reservation.kind)
            .await?;
        tracing::debug!(user_id = %reservation.user_id, kind = %reservation.kind, "Quota unit refunded");
        Ok(())
    }

    /// Remaining units without reserving anything
    pub async fn peek(&self, user_id: &str, kind: QuotaKind, now: DateTime<Utc>) -> DiscoveryResult<Remaining> {
        let tier = self.subscriptions.tier_of(user_id).await?;
        let Some(ceiling) = self.limits.limits(tier).limit_for(kind) else {
            return Ok(Remaining::Unlimited);
        };
        let usage = self.store.usage(user_id, &day_key(now)).await?;
        let used = usage.as_ref().map(|u| used_of(u, kind)).unwrap_or(0);
        Ok(Remaining::Limited(ceiling.saturating_sub(used)))
    }

    pub async fn status(&self, user_id: &str, now: DateTime<Utc>) -> DiscoveryResult<QuotaStatus> {
        let tier = self.subscriptions.tier_of(user_id).await?;
        let limits = self.limits.limits(tier);
        let day = day_key(now);
        let usage = self.store.usage(user_id, &day).await?;

        let entry = |kind: QuotaKind| {
            let daily_limit = limits.limit_for(kind);
            let used_today = usage.as_ref().map(|u| used_of(u, kind)).unwrap_or(0);
            QuotaEntry {
                kind,
                daily_limit,
                used_today,
                remaining: match daily_limit {
                    Some(limit) => Remaining::Limited(limit.saturating_sub(used_today)),
                    None => Remaining::Unlimited,
                },
            }
        };

        Ok(QuotaStatus {
            tier,
            date: day,
            reset_at: next_reset(now),
            likes: entry(QuotaKind::Likes),
            super_likes: entry(QuotaKind::SuperLikes),
        })
    }
}

fn used_of(usage: &DailyLimit, kind: QuotaKind) -> u32 {
    match kind {
        QuotaKind::Likes => usage.likes_count,
        QuotaKind::SuperLikes => usage.super_likes_count,
    }
}
