use crate::core::quota::{QuotaKind, Remaining, Tier};
use crate::core::swipe::SwipeIntent;
use crate::models::domain::{Gender, MatchStatus, Mode, Photo, Profile, ScoreBreakdown, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Photo as shown to other users
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicPhoto {
    pub id: String,
    pub url: String,
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
    pub order: i32,
}

impl From<&Photo> for PublicPhoto {
    fn from(photo: &Photo) -> Self {
        Self {
            id: photo.id.clone(),
            url: photo.url.clone(),
            is_primary: photo.is_primary,
            order: photo.order,
        }
    }
}

/// Profile fields another user may see; never carries coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicProfile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<Gender>,
    pub mode: Mode,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub avatar: Option<String>,
    pub photos: Vec<PublicPhoto>,
}

impl PublicProfile {
    /// Snapshot of a profile with its active photos, primary first
    pub fn from_profile(profile: &Profile, photos: &[Photo]) -> Self {
        let mut visible: Vec<&Photo> = photos.iter().filter(|p| p.is_active).collect();
        visible.sort_by_key(|p| (!p.is_primary, p.order));

        Self {
            user_id: profile.user_id.clone(),
            display_name: profile.display_name.clone(),
            age: profile.age,
            gender: profile.gender,
            mode: profile.mode,
            bio: profile.bio.clone(),
            interests: profile.interests.clone(),
            avatar: visible.first().map(|p| p.url.clone()),
            photos: visible.into_iter().map(PublicPhoto::from).collect(),
        }
    }
}

/// One discovery card
#[derive(Debug, Clone, Serialize)]
pub struct MatchCard {
    pub profile: PublicProfile,
    /// Kilometers, one decimal, when both sides have coordinates
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardsResponse {
    pub cards: Vec<MatchCard>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
    #[serde(rename = "poolSize")]
    pub pool_size: usize,
}

/// Match as returned from a swipe that completed a pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
    /// Target's public profile at match time
    pub target: PublicProfile,
}

/// Reciprocity result of a like or superlike
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    NoMatch,
    Matched(MatchSnapshot),
}

impl MatchOutcome {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn snapshot(&self) -> Option<&MatchSnapshot> {
        match self {
            MatchOutcome::Matched(snapshot) => Some(snapshot),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// Result of a like or superlike
#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    pub action: SwipeIntent,
    pub outcome: MatchOutcome,
    /// Remaining units of the quota kind this action draws from
    pub remaining: Remaining,
    /// True when the same state was already recorded
    #[serde(rename = "alreadyRecorded")]
    pub already_recorded: bool,
}

impl SwipeOutcome {
    pub fn matched(&self) -> bool {
        self.outcome.is_matched()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PassOutcome {
    pub action: SwipeIntent,
    #[serde(rename = "alreadyRecorded")]
    pub already_recorded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaEntry {
    pub kind: QuotaKind,
    #[serde(rename = "dailyLimit")]
    pub daily_limit: Option<u32>,
    #[serde(rename = "usedToday")]
    pub used_today: u32,
    pub remaining: Remaining,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    #[serde(rename = "subscriptionTier")]
    pub tier: Tier,
    pub date: String,
    #[serde(rename = "resetAt")]
    pub reset_at: DateTime<Utc>,
    pub likes: QuotaEntry,
    #[serde(rename = "superLikes")]
    pub super_likes: QuotaEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchDetail {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    pub status: MatchStatus,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
    #[serde(rename = "unmatchedAt", skip_serializing_if = "Option::is_none")]
    pub unmatched_at: Option<DateTime<Utc>>,
    pub other: PublicProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchListResponse {
    pub matches: Vec<MatchDetail>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmatchResponse {
    pub success: bool,
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchStatusResponse {
    pub matched: bool,
    #[serde(rename = "matchId")]
    pub match_id: Option<Uuid>,
    #[serde(rename = "userLiked")]
    pub user_liked: bool,
    #[serde(rename = "targetLiked")]
    pub target_liked: bool,
}

/// Someone whose like on the caller is still pending
#[derive(Debug, Clone, Serialize)]
pub struct LikerEntry {
    pub profile: PublicProfile,
    #[serde(rename = "isSuperLike")]
    pub is_super_like: bool,
    #[serde(rename = "likedAt")]
    pub liked_at: DateTime<Utc>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
    #[serde(rename = "resetAt", skip_serializing_if = "Option::is_none", default)]
    pub reset_at: Option<DateTime<Utc>>,
}

/// Round a distance for display
pub fn display_distance(distance_km: f64) -> f64 {
    (distance_km * 10.0).round() / 10.0
}
