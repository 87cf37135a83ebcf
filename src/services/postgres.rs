use crate::core::distance::longitude_ranges;
use crate::core::filters::matches_candidate_query;
use crate::core::quota::{QuotaKind, Tier, TierLimits};
use crate::models::{
    CandidateQuery, DailyLimit, Gender, GenderPreference, GeoPoint, Match, MatchStatus, Mode, Photo,
    Preference, Profile, RadiusFilter, Swipe, SwipeAction, UserId, UserPair,
};
use crate::services::ports::{
    BlockStore, CandidateRepository, MatchStore, PhotoStore, PreferenceStore, ProfileStore,
    QuotaStore, StoreError, StoreResult, SubscriptionStore, SwipeInsert, SwipeLedger,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Swipe action as stored in the `swipe_action` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "swipe_action", rename_all = "lowercase")]
pub enum PgSwipeAction {
    Like,
    Pass,
}

impl From<SwipeAction> for PgSwipeAction {
    fn from(value: SwipeAction) -> Self {
        match value {
            SwipeAction::Like => PgSwipeAction::Like,
            SwipeAction::Pass => PgSwipeAction::Pass,
        }
    }
}

impl From<PgSwipeAction> for SwipeAction {
    fn from(value: PgSwipeAction) -> Self {
        match value {
            PgSwipeAction::Like => SwipeAction::Like,
            PgSwipeAction::Pass => SwipeAction::Pass,
        }
    }
}

/// Match status as stored in the `match_status` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum PgMatchStatus {
    Active,
    Unmatched,
    Blocked,
}

impl From<MatchStatus> for PgMatchStatus {
    fn from(value: MatchStatus) -> Self {
        match value {
            MatchStatus::Active => PgMatchStatus::Active,
            MatchStatus::Unmatched => PgMatchStatus::Unmatched,
            MatchStatus::Blocked => PgMatchStatus::Blocked,
        }
    }
}

impl From<PgMatchStatus> for MatchStatus {
    fn from(value: PgMatchStatus) -> Self {
        match value {
            PgMatchStatus::Active => MatchStatus::Active,
            PgMatchStatus::Unmatched => MatchStatus::Unmatched,
            PgMatchStatus::Blocked => MatchStatus::Blocked,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "user_id, display_name, age, gender, mode, interests, longitude, latitude, bio, updated_at";
const SWIPE_COLUMNS: &str = "actor_id, target_id, action, is_super_like, created_at, score";
const MATCH_COLUMNS: &str = "id, user_id, target_user_id, status, matched_at, unmatched_at";

#[derive(Debug, FromRow)]
struct ProfileRow {
    user_id: String,
    display_name: Option<String>,
    age: Option<i16>,
    gender: Option<String>,
    mode: String,
    interests: Vec<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    bio: Option<String>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(StoreError::InvalidData)?;
        let mode = row.mode.parse::<Mode>().map_err(StoreError::InvalidData)?;
        let location = match (row.longitude, row.latitude) {
            (Some(lon), Some(lat)) => Some(GeoPoint::new(lon, lat)),
            _ => None,
        };

        Ok(Profile {
            user_id: row.user_id,
            display_name: row.display_name,
            age: row.age.and_then(|a| u8::try_from(a).ok()),
            gender,
            mode,
            interests: row.interests,
            location,
            bio: row.bio,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PhotoRow {
    id: String,
    user_id: String,
    url: String,
    is_primary: bool,
    is_active: bool,
    sort_order: i32,
}

impl From<PhotoRow> for Photo {
    fn from(row: PhotoRow) -> Self {
        Photo {
            id: row.id,
            user_id: row.user_id,
            url: row.url,
            is_primary: row.is_primary,
            is_active: row.is_active,
            order: row.sort_order,
        }
    }
}

#[derive(Debug, FromRow)]
struct PreferenceRow {
    user_id: String,
    age_min: i16,
    age_max: i16,
    gender_preference: Vec<String>,
    max_distance_km: Option<f64>,
    mode: String,
    interests: Vec<String>,
}

impl TryFrom<PreferenceRow> for Preference {
    type Error = StoreError;

    fn try_from(row: PreferenceRow) -> Result<Self, Self::Error> {
        let gender_preference = row
            .gender_preference
            .iter()
            .map(|g| g.parse::<GenderPreference>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::InvalidData)?;

        Ok(Preference {
            user_id: row.user_id,
            age_min: u8::try_from(row.age_min).unwrap_or(Preference::DEFAULT_AGE_MIN),
            age_max: u8::try_from(row.age_max).unwrap_or(Preference::DEFAULT_AGE_MAX),
            gender_preference,
            max_distance_km: row.max_distance_km,
            mode: row.mode.parse::<Mode>().map_err(StoreError::InvalidData)?,
            interests: row.interests,
        })
    }
}

#[derive(Debug, FromRow)]
struct SwipeRow {
    actor_id: String,
    target_id: String,
    action: PgSwipeAction,
    is_super_like: bool,
    created_at: DateTime<Utc>,
    score: Option<f64>,
}

impl From<SwipeRow> for Swipe {
    fn from(row: SwipeRow) -> Self {
        Swipe {
            actor_id: row.actor_id,
            target_id: row.target_id,
            action: row.action.into(),
            is_super_like: row.is_super_like,
            timestamp: row.created_at,
            score: row.score,
        }
    }
}

#[derive(Debug, FromRow)]
struct DailyLimitRow {
    user_id: String,
    day: String,
    likes_count: i32,
    super_likes_count: i32,
    max_likes: Option<i32>,
    max_super_likes: Option<i32>,
}

fn to_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl From<DailyLimitRow> for DailyLimit {
    fn from(row: DailyLimitRow) -> Self {
        DailyLimit {
            user_id: row.user_id,
            day: row.day,
            likes_count: to_count(row.likes_count),
            super_likes_count: to_count(row.super_likes_count),
            max_likes: row.max_likes.map(to_count),
            max_super_likes: row.max_super_likes.map(to_count),
        }
    }
}

#[derive(Debug, FromRow)]
struct MatchRow {
    id: Uuid,
    user_id: String,
    target_user_id: String,
    status: PgMatchStatus,
    matched_at: DateTime<Utc>,
    unmatched_at: Option<DateTime<Utc>>,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Match {
            id: row.id,
            user_id: row.user_id,
            target_user_id: row.target_user_id,
            status: row.status.into(),
            matched_at: row.matched_at,
            unmatched_at: row.unmatched_at,
        }
    }
}

fn counter_column(kind: QuotaKind) -> &'static str {
    match kind {
        QuotaKind::Likes => "likes_count",
        QuotaKind::SuperLikes => "super_likes_count",
    }
}

fn to_i32(value: Option<u32>) -> Option<i32> {
    value.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}

/// Great-circle distance in km from ($13, $14) to the row's coordinates
const HAVERSINE_SQL: &str = "(12742.0 * asin(LEAST(1.0, sqrt(\
    power(sin(radians(latitude - $13::float8) / 2), 2) \
    + cos(radians($13::float8)) * cos(radians(latitude)) \
    * power(sin(radians(longitude - $14::float8) / 2), 2)))))";

/// Radius filter parameters of the candidate query
#[derive(Debug, Clone, Copy, Default)]
struct RadiusBinds {
    min_lat: f64,
    max_lat: f64,
    lon_range: (f64, f64),
    /// Second longitude interval when the box crosses the antimeridian
    wrapped: Option<(f64, f64)>,
    center_lat: f64,
    center_lon: f64,
    max_distance_km: f64,
}

impl From<&RadiusFilter> for RadiusBinds {
    fn from(radius: &RadiusFilter) -> Self {
        let (lon_range, wrapped) = longitude_ranges(&radius.bounding_box);
        Self {
            min_lat: radius.bounding_box.min_lat,
            max_lat: radius.bounding_box.max_lat,
            lon_range,
            wrapped,
            center_lat: radius.center.latitude,
            center_lon: radius.center.longitude,
            max_distance_km: radius.max_distance_km,
        }
    }
}

/// PostgreSQL adapter for every discovery collaborator
///
/// Conditional writes are single statements: `ON CONFLICT` for inserts,
/// `UPDATE ... WHERE` for compare-and-set, and the quota counter uses an
/// upsert whose update only fires below the ceiling.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run pending migrations
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::info!(max_connections, "PostgreSQL pool ready, migrations applied");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let query = format!("SELECT {} FROM profiles WHERE user_id = $1", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> StoreResult<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {} FROM profiles WHERE user_id = ANY($1)", PROFILE_COLUMNS);
        let rows = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn create_default_profile(&self, user_id: &str, now: DateTime<Utc>) -> StoreResult<Profile> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO profiles (user_id, updated_at)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            tracing::info!(user_id, "Created default profile");
        }

        self.find_profile(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", user_id)))
    }
}

#[async_trait]
impl CandidateRepository for PgStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> StoreResult<Vec<Profile>> {
        let excluded: Vec<String> = query.exclude_user_ids.iter().cloned().collect();
        let (age_min, age_max) = match query.age_range {
            Some((min, max)) => (Some(i16::from(min)), Some(i16::from(max))),
            None => (None, None),
        };
        let genders: Option<Vec<String>> = query
            .genders
            .as_ref()
            .map(|g| g.iter().map(|g| g.as_str().to_string()).collect());
        let radius = query.radius.as_ref().map(RadiusBinds::from);
        let r = radius.unwrap_or_default();

        // Every hard filter runs in SQL so LIMIT only counts qualifying rows
        let sql = format!(
            r#"
            SELECT {}
            FROM profiles
            WHERE user_id <> $1
              AND NOT (user_id = ANY($2))
              AND mode = $3
              AND ($4::smallint IS NULL OR (age IS NOT NULL AND age BETWEEN $4 AND $5))
              AND ($6::text[] IS NULL OR gender = ANY($6))
              AND ($7::float8 IS NULL OR (
                    latitude IS NOT NULL AND longitude IS NOT NULL
                    AND latitude BETWEEN $7 AND $8
                    AND (longitude BETWEEN $9 AND $10
                         OR ($11::float8 IS NOT NULL AND longitude BETWEEN $11 AND $12))
                    AND {} <= $15))
            ORDER BY user_id
            LIMIT $16
            "#,
            PROFILE_COLUMNS, HAVERSINE_SQL
        );

        let rows = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(&query.actor_id)
            .bind(&excluded)
            .bind(query.mode.as_str())
            .bind(age_min)
            .bind(age_max)
            .bind(genders)
            .bind(radius.map(|_| r.min_lat))
            .bind(r.max_lat)
            .bind(r.lon_range.0)
            .bind(r.lon_range.1)
            .bind(r.wrapped.map(|w| w.0))
            .bind(r.wrapped.map(|w| w.1))
            .bind(r.center_lat)
            .bind(r.center_lon)
            .bind(r.max_distance_km)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut pool = Vec::with_capacity(rows.len());
        for row in rows {
            let profile = Profile::try_from(row)?;
            if matches_candidate_query(&profile, query) {
                pool.push(profile);
            }
        }

        tracing::debug!(
            user_id = %query.actor_id,
            excluded = excluded.len(),
            pool = pool.len(),
            "Fetched candidate pool"
        );
        Ok(pool)
    }
}

#[async_trait]
impl PhotoStore for PgStore {
    async fn get_user_photos(&self, user_id: &str) -> StoreResult<Vec<Photo>> {
        let rows = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, user_id, url, is_primary, is_active, sort_order
            FROM photos
            WHERE user_id = $1
            ORDER BY sort_order
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Photo::from).collect())
    }

    async fn get_primary_photo(&self, user_id: &str) -> StoreResult<Option<Photo>> {
        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT id, user_id, url, is_primary, is_active, sort_order
            FROM photos
            WHERE user_id = $1 AND is_primary AND is_active
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Photo::from))
    }

    async fn active_photo_counts(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, usize>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT user_id, COUNT(*)
            FROM photos
            WHERE user_id = ANY($1) AND is_active
            GROUP BY user_id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, count)| (user_id, usize::try_from(count).unwrap_or(0)))
            .collect())
    }
}

#[async_trait]
impl BlockStore for PgStore {
    async fn is_blocked(&self, user_id: &str, target_id: &str) -> StoreResult<bool> {
        let blocked: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM blocks
                WHERE (blocker_id = $1 AND blocked_id = $2)
                   OR (blocker_id = $2 AND blocked_id = $1)
            )
            "#,
        )
        .bind(user_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(blocked)
    }

    async fn blocked_user_ids(&self, user_id: &str) -> StoreResult<HashSet<UserId>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT blocked_id FROM blocks WHERE blocker_id = $1
            UNION
            SELECT blocker_id FROM blocks WHERE blocked_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl PreferenceStore for PgStore {
    async fn get_or_create_default(&self, user_id: &str) -> StoreResult<Preference> {
        let defaults = Preference::default_for(user_id);
        let gender_preference: Vec<String> = defaults
            .gender_preference
            .iter()
            .map(|g| g.as_str().to_string())
            .collect();

        sqlx::query(
            r#"
            INSERT INTO preferences (user_id, age_min, age_max, gender_preference, max_distance_km, mode)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(i16::from(defaults.age_min))
        .bind(i16::from(defaults.age_max))
        .bind(&gender_preference)
        .bind(defaults.max_distance_km)
        .bind(defaults.mode.as_str())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT user_id, age_min, age_max, gender_preference, max_distance_km, mode, interests
            FROM preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Preference::try_from(row)
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn tier_of(&self, user_id: &str) -> StoreResult<Tier> {
        let tier: Option<String> = sqlx::query_scalar(
            r#"
            SELECT tier FROM subscriptions
            WHERE user_id = $1 AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match tier {
            Some(tier) => tier.parse().map_err(StoreError::InvalidData),
            None => Ok(Tier::Free),
        }
    }
}

#[async_trait]
impl SwipeLedger for PgStore {
    async fn find_swipe(&self, actor_id: &str, target_id: &str) -> StoreResult<Option<Swipe>> {
        let query = format!(
            "SELECT {} FROM swipes WHERE actor_id = $1 AND target_id = $2",
            SWIPE_COLUMNS
        );
        let row = sqlx::query_as::<_, SwipeRow>(&query)
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Swipe::from))
    }

    async fn insert_swipe(&self, swipe: &Swipe) -> StoreResult<SwipeInsert> {
        let result = sqlx::query(
            r#"
            INSERT INTO swipes (actor_id, target_id, action, is_super_like, created_at, score)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (actor_id, target_id) DO NOTHING
            "#,
        )
        .bind(&swipe.actor_id)
        .bind(&swipe.target_id)
        .bind(PgSwipeAction::from(swipe.action))
        .bind(swipe.is_super_like)
        .bind(swipe.timestamp)
        .bind(swipe.score)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(SwipeInsert::Inserted);
        }

        // Swipe rows are never deleted, so the conflicting row is still there
        let existing = self
            .find_swipe(&swipe.actor_id, &swipe.target_id)
            .await?
            .ok_or_else(|| {
                StoreError::NotFound(format!("swipe {} -> {}", swipe.actor_id, swipe.target_id))
            })?;
        Ok(SwipeInsert::Conflict(existing))
    }

    async fn update_swipe(&self, expected: &Swipe, updated: &Swipe) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE swipes
            SET action = $3, is_super_like = $4, created_at = $5, score = $6
            WHERE actor_id = $1 AND target_id = $2
              AND action = $7 AND is_super_like = $8
            "#,
        )
        .bind(&expected.actor_id)
        .bind(&expected.target_id)
        .bind(PgSwipeAction::from(updated.action))
        .bind(updated.is_super_like)
        .bind(updated.timestamp)
        .bind(updated.score)
        .bind(PgSwipeAction::from(expected.action))
        .bind(expected.is_super_like)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_likes(&self, pair: &UserPair) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE swipes
            SET action = 'pass', is_super_like = FALSE
            WHERE action = 'like'
              AND ((actor_id = $1 AND target_id = $2) OR (actor_id = $2 AND target_id = $1))
            "#,
        )
        .bind(pair.first())
        .bind(pair.second())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn swiped_target_ids(&self, actor_id: &str) -> StoreResult<HashSet<UserId>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT target_id FROM swipes WHERE actor_id = $1")
            .bind(actor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn recent_swipes(&self, actor_id: &str, limit: usize) -> StoreResult<Vec<Swipe>> {
        let query = format!(
            "SELECT {} FROM swipes WHERE actor_id = $1 ORDER BY created_at DESC LIMIT $2",
            SWIPE_COLUMNS
        );
        let rows = sqlx::query_as::<_, SwipeRow>(&query)
            .bind(actor_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Swipe::from).collect())
    }

    async fn likers_of(&self, target_id: &str) -> StoreResult<Vec<Swipe>> {
        let query = format!(
            "SELECT {} FROM swipes WHERE target_id = $1 AND action = 'like' ORDER BY created_at DESC",
            SWIPE_COLUMNS
        );
        let rows = sqlx::query_as::<_, SwipeRow>(&query)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Swipe::from).collect())
    }
}

#[async_trait]
impl QuotaStore for PgStore {
    async fn try_reserve(
        &self,
        user_id: &str,
        day: &str,
        kind: QuotaKind,
        ceiling: u32,
        limits: &TierLimits,
    ) -> StoreResult<Option<u32>> {
        if ceiling == 0 {
            return Ok(None);
        }

        let column = counter_column(kind);
        let (likes, super_likes) = match kind {
            QuotaKind::Likes => (1i32, 0i32),
            QuotaKind::SuperLikes => (0i32, 1i32),
        };

        // Single round trip: the update branch only fires below the ceiling
        let sql = format!(
            r#"
            INSERT INTO daily_limits
                (user_id, day, likes_count, super_likes_count, max_likes, max_super_likes)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, day) DO UPDATE
                SET {column} = daily_limits.{column} + 1
                WHERE daily_limits.{column} < $7
            RETURNING {column}
            "#,
            column = column
        );

        let count: Option<i32> = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(day)
            .bind(likes)
            .bind(super_likes)
            .bind(to_i32(limits.likes))
            .bind(to_i32(limits.super_likes))
            .bind(i32::try_from(ceiling).unwrap_or(i32::MAX))
            .fetch_optional(&self.pool)
            .await?;

        Ok(count.map(to_count))
    }

    async fn refund(&self, user_id: &str, day: &str, kind: QuotaKind) -> StoreResult<()> {
        let column = counter_column(kind);
        let sql = format!(
            "UPDATE daily_limits SET {column} = GREATEST({column} - 1, 0) WHERE user_id = $1 AND day = $2",
            column = column
        );
        sqlx::query(&sql).bind(user_id).bind(day).execute(&self.pool).await?;
        Ok(())
    }

    async fn usage(&self, user_id: &str, day: &str) -> StoreResult<Option<DailyLimit>> {
        let row = sqlx::query_as::<_, DailyLimitRow>(
            r#"
            SELECT user_id, day, likes_count, super_likes_count, max_likes, max_super_likes
            FROM daily_limits
            WHERE user_id = $1 AND day = $2
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DailyLimit::from))
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn insert_active(&self, record: &Match) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO matches (id, user_id, target_user_id, status, matched_at)
            VALUES ($1, $2, $3, 'active', $4)
            ON CONFLICT (user_id, target_user_id) WHERE status = 'active' DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.target_user_id)
        .bind(record.matched_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_active(&self, pair: &UserPair) -> StoreResult<Option<Match>> {
        let query = format!(
            "SELECT {} FROM matches WHERE user_id = $1 AND target_user_id = $2 AND status = 'active'",
            MATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, MatchRow>(&query)
            .bind(pair.first())
            .bind(pair.second())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Match::from))
    }

    async fn find_by_id(&self, match_id: Uuid) -> StoreResult<Option<Match>> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);
        let row = sqlx::query_as::<_, MatchRow>(&query)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Match::from))
    }

    async fn transition_status(
        &self,
        match_id: Uuid,
        to: MatchStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Match>> {
        let query = format!(
            "UPDATE matches SET status = $2, unmatched_at = $3 WHERE id = $1 AND status = 'active' RETURNING {}",
            MATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, MatchRow>(&query)
            .bind(match_id)
            .bind(PgMatchStatus::from(to))
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Match::from))
    }

    async fn active_matches_for(&self, user_id: &str, limit: usize, offset: usize) -> StoreResult<Vec<Match>> {
        let query = format!(
            r#"
            SELECT {}
            FROM matches
            WHERE (user_id = $1 OR target_user_id = $1) AND status = 'active'
            ORDER BY matched_at DESC
            LIMIT $2 OFFSET $3
            "#,
            MATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, MatchRow>(&query)
            .bind(user_id)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Match::from).collect())
    }

    async fn count_active_for(&self, user_id: &str) -> StoreResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches WHERE (user_id = $1 OR target_user_id = $1) AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
