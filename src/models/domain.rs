use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = String;

/// Geographic point, stored longitude first like GeoJSON
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// What a user is on the app for; candidates only ever see the same mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Dating,
    Friend,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Dating => "dating",
            Mode::Friend => "friend",
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dating" => Ok(Mode::Dating),
            "friend" => Ok(Mode::Friend),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

/// User profile, owned by the profile store and read-only here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Minimal profile used when a recommendation request arrives before
    /// the profile service has written one
    pub fn minimal(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            display_name: None,
            age: None,
            gender: None,
            mode: Mode::Dating,
            interests: Vec::new(),
            location: None,
            bio: None,
            updated_at: now,
        }
    }

    pub fn bio_text(&self) -> &str {
        self.bio.as_deref().unwrap_or("")
    }

    pub fn name_or_id(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPreference {
    Male,
    Female,
    Other,
    All,
}

impl GenderPreference {
    pub fn gender(&self) -> Option<Gender> {
        match self {
            GenderPreference::Male => Some(Gender::Male),
            GenderPreference::Female => Some(Gender::Female),
            GenderPreference::Other => Some(Gender::Other),
            GenderPreference::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenderPreference::Male => "male",
            GenderPreference::Female => "female",
            GenderPreference::Other => "other",
            GenderPreference::All => "all",
        }
    }
}

impl FromStr for GenderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(GenderPreference::All),
            other => other.parse::<Gender>().map(|g| match g {
                Gender::Male => GenderPreference::Male,
                Gender::Female => GenderPreference::Female,
                Gender::Other => GenderPreference::Other,
            }),
        }
    }
}

/// Discovery preferences, one per user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "ageMin")]
    pub age_min: u8,
    #[serde(rename = "ageMax")]
    pub age_max: u8,
    #[serde(rename = "genderPreference")]
    pub gender_preference: Vec<GenderPreference>,
    #[serde(rename = "maxDistanceKm")]
    pub max_distance_km: Option<f64>,
    pub mode: Mode,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl Preference {
    pub const DEFAULT_AGE_MIN: u8 = 18;
    pub const DEFAULT_AGE_MAX: u8 = 99;
    pub const DEFAULT_MAX_DISTANCE_KM: f64 = 50.0;

    pub fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            age_min: Self::DEFAULT_AGE_MIN,
            age_max: Self::DEFAULT_AGE_MAX,
            gender_preference: vec![GenderPreference::All],
            max_distance_km: Some(Self::DEFAULT_MAX_DISTANCE_KM),
            mode: Mode::Dating,
            interests: Vec::new(),
        }
    }

    /// Genders to hard-filter on, or `None` when any gender is acceptable
    pub fn gender_filter(&self) -> Option<Vec<Gender>> {
        if self.gender_preference.is_empty()
            || self.gender_preference.contains(&GenderPreference::All)
        {
            return None;
        }
        Some(self.gender_preference.iter().filter_map(|g| g.gender()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Pass,
}

/// One recorded decision of `actor_id` about `target_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swipe {
    #[serde(rename = "actorId")]
    pub actor_id: UserId,
    #[serde(rename = "targetId")]
    pub target_id: UserId,
    pub action: SwipeAction,
    #[serde(rename = "isSuperLike")]
    pub is_super_like: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl Swipe {
    pub fn is_like(&self) -> bool {
        self.action == SwipeAction::Like
    }
}

/// Per-user, per-UTC-day action counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyLimit {
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// `YYYY-MM-DD` in UTC
    pub day: String,
    #[serde(rename = "likesCount")]
    pub likes_count: u32,
    #[serde(rename = "superLikesCount")]
    pub super_likes_count: u32,
    /// `None` means unlimited
    #[serde(rename = "maxLikes")]
    pub max_likes: Option<u32>,
    #[serde(rename = "maxSuperLikes")]
    pub max_super_likes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Unmatched,
    Blocked,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Active)
    }
}

/// Unordered pair of users, stored with the byte-wise smaller id first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserPair {
    first: UserId,
    second: UserId,
}

impl UserPair {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { first: a.to_string(), second: b.to_string() }
        } else {
            Self { first: b.to_string(), second: a.to_string() }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.first == user_id || self.second == user_id
    }
}

impl fmt::Display for UserPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.second)
    }
}

/// Mutual connection between two users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    #[serde(rename = "targetUserId")]
    pub target_user_id: UserId,
    pub status: MatchStatus,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
    #[serde(rename = "unmatchedAt", default)]
    pub unmatched_at: Option<DateTime<Utc>>,
}

impl Match {
    /// New active match for a pair, in canonical order
    pub fn active(pair: &UserPair, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: pair.first().to_string(),
            target_user_id: pair.second().to_string(),
            status: MatchStatus::Active,
            matched_at: now,
            unmatched_at: None,
        }
    }

    pub fn pair(&self) -> UserPair {
        UserPair::new(&self.user_id, &self.target_user_id)
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.target_user_id == user_id
    }

    pub fn other_party(&self, user_id: &str) -> &str {
        if self.user_id == user_id {
            &self.target_user_id
        } else {
            &self.user_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub url: String,
    #[serde(rename = "isPrimary")]
    pub is_primary: bool,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    pub order: i32,
}

/// Sub-scores of one candidate, each in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    #[serde(rename = "filterScore")]
    pub filter: f64,
    #[serde(rename = "interestScore")]
    pub interest: f64,
    #[serde(rename = "activityScore")]
    pub activity: f64,
    #[serde(rename = "diversityScore")]
    pub diversity: f64,
    #[serde(rename = "locationScore")]
    pub location: f64,
    pub total: f64,
}

/// Candidate with its rank score
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub profile: Profile,
    pub breakdown: ScoreBreakdown,
    pub distance_km: Option<f64>,
}

/// Fixed weights combining the five sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub filter: f64,
    pub interest: f64,
    pub activity: f64,
    pub diversity: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            filter: 0.30,
            interest: 0.20,
            activity: 0.10,
            diversity: 0.15,
            location: 0.25,
        }
    }
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Radius constraint of a candidate query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusFilter {
    pub center: GeoPoint,
    pub max_distance_km: f64,
    pub bounding_box: BoundingBox,
}

/// Hard filters for one candidate pool fetch
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub actor_id: UserId,
    pub mode: Mode,
    /// Inclusive range, `None` when the actor has no age set
    pub age_range: Option<(u8, u8)>,
    /// `None` when every gender is acceptable
    pub genders: Option<Vec<Gender>>,
    pub radius: Option<RadiusFilter>,
    pub exclude_user_ids: std::collections::HashSet<UserId>,
    pub limit: usize,
}
