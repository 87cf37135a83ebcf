use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription level controlling daily action quotas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    #[default]
    Free,
    Basic,
    Gold,
    Elite,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Basic => "BASIC",
            Tier::Gold => "GOLD",
            Tier::Elite => "ELITE",
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FREE" => Ok(Tier::Free),
            "BASIC" => Ok(Tier::Basic),
            "GOLD" => Ok(Tier::Gold),
            "ELITE" => Ok(Tier::Elite),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

/// Counted daily action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuotaKind {
    Likes,
    SuperLikes,
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaKind::Likes => write!(f, "likes"),
            QuotaKind::SuperLikes => write!(f, "superlikes"),
        }
    }
}

/// Daily limits of one tier, `None` means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub likes: Option<u32>,
    pub super_likes: Option<u32>,
}

impl TierLimits {
    pub fn limit_for(&self, kind: QuotaKind) -> Option<u32> {
        match kind {
            QuotaKind::Likes => self.likes,
            QuotaKind::SuperLikes => self.super_likes,
        }
    }

    pub fn allows(&self, kind: QuotaKind) -> bool {
        self.limit_for(kind) != Some(0)
    }
}

/// Immutable per-tier limit table, built once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimitTable {
    pub free: TierLimits,
    pub basic: TierLimits,
    pub gold: TierLimits,
    pub elite: TierLimits,
}

impl TierLimitTable {
    pub fn limits(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::Free => self.free,
            Tier::Basic => self.basic,
            Tier::Gold => self.gold,
            Tier::Elite => self.elite,
        }
    }
}

impl Default for TierLimitTable {
    fn default() -> Self {
        Self {
            free: TierLimits { likes: Some(30), super_likes: Some(0) },
            basic: TierLimits { likes: None, super_likes: Some(1) },
            gold: TierLimits { likes: None, super_likes: Some(3) },
            elite: TierLimits { likes: None, super_likes: Some(5) },
        }
    }
}

/// Remaining units of a quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Limited(u32),
    Unlimited,
}

impl Serialize for Remaining {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Limited(n) => serializer.serialize_u32(*n),
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// Quota day key, the UTC calendar date as `YYYY-MM-DD`
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Next UTC midnight after `now`
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}
