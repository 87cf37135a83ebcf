use crate::models::{Photo, UserId};
use crate::services::ports::{PhotoStore, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is an in-process moka cache. L2 is Redis, shared across instances,
/// and optional: without a Redis URL the manager runs L1 only.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an L1-only cache manager
    pub fn local(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_l2(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;
                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;
        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from every configured tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL").arg(key).query_async::<()>(&mut *conn).await?;
        }
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            l2_enabled: self.has_l2(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub l2_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Photo list of one user
    pub fn photos(user_id: &str) -> String {
        format!("photos:{}", user_id)
    }
}

/// Read-through cache over a photo store
///
/// Photo lists are read for every card and every match snapshot, but
/// change rarely. Cache failures fall back to the inner store.
pub struct CachedPhotoStore {
    inner: Arc<dyn PhotoStore>,
    cache: Arc<CacheManager>,
}

impl CachedPhotoStore {
    pub fn new(inner: Arc<dyn PhotoStore>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    /// Drop the cached photo list of a user
    pub async fn invalidate(&self, user_id: &str) {
        if let Err(e) = self.cache.delete(&CacheKey::photos(user_id)).await {
            tracing::warn!(user_id, "Failed to invalidate photo cache: {}", e);
        }
    }

    async fn cached(&self, user_id: &str) -> Option<Vec<Photo>> {
        match self.cache.get::<Vec<Photo>>(&CacheKey::photos(user_id)).await {
            Ok(photos) => Some(photos),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!(user_id, "Photo cache read failed, using store: {}", e);
                None
            }
        }
    }
}

#[async_trait]
impl PhotoStore for CachedPhotoStore {
    async fn get_user_photos(&self, user_id: &str) -> StoreResult<Vec<Photo>> {
        if let Some(photos) = self.cached(user_id).await {
            return Ok(photos);
        }

        let photos = self.inner.get_user_photos(user_id).await?;
        if let Err(e) = self.cache.set(&CacheKey::photos(user_id), &photos).await {
            tracing::warn!(user_id, "Photo cache write failed: {}", e);
        }
        Ok(photos)
    }

    async fn get_primary_photo(&self, user_id: &str) -> StoreResult<Option<Photo>> {
        let photos = self.get_user_photos(user_id).await?;
        Ok(photos.into_iter().find(|p| p.is_primary && p.is_active))
    }

    async fn active_photo_counts(&self, user_ids: &[UserId]) -> StoreResult<HashMap<UserId, usize>> {
        let mut counts = HashMap::with_capacity(user_ids.len());
        let mut misses = Vec::new();

        for user_id in user_ids {
            match self.cached(user_id).await {
                Some(photos) => {
                    counts.insert(user_id.clone(), photos.iter().filter(|p| p.is_active).count());
                }
                None => misses.push(user_id.clone()),
            }
        }

        // One batched lookup for everything not cached
        if !misses.is_empty() {
            counts.extend(self.inner.active_photo_counts(&misses).await?);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryStore;

    fn photo(id: &str, user_id: &str, primary: bool) -> Photo {
        Photo {
            id: id.to_string(),
            user_id: user_id.to_string(),
            url: format!("https://cdn.example.com/{}.jpg", id),
            is_primary: primary,
            is_active: true,
            order: 0,
        }
    }

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        cache.set("test_key", &"test_value").await.unwrap();
        let result: String = cache.get("test_key").await.unwrap();
        assert_eq!(result, "test_value");

        cache.delete("test_key").await.unwrap();
        assert!(cache.get::<String>("test_key").await.is_err());
    }

    #[tokio::test]
    async fn test_local_cache_round_trip() {
        let cache = CacheManager::local(100, 60);
        assert!(!cache.has_l2());

        cache.set("k", &vec![1u32, 2, 3]).await.unwrap();
        let value: Vec<u32> = cache.get("k").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get::<Vec<u32>>("k").await, Err(CacheError::CacheMiss(_))));
    }

    #[tokio::test]
    async fn test_cached_photo_store_reads_through() {
        let store = Arc::new(MemoryStore::new());
        store.add_photo(photo("p1", "u1", true)).await;

        let cached = CachedPhotoStore::new(store.clone(), Arc::new(CacheManager::local(100, 60)));
        assert_eq!(cached.get_user_photos("u1").await.unwrap().len(), 1);

        // Served from cache until invalidated
        store.add_photo(photo("p2", "u1", false)).await;
        assert_eq!(cached.get_user_photos("u1").await.unwrap().len(), 1);

        cached.invalidate("u1").await;
        assert_eq!(cached.get_user_photos("u1").await.unwrap().len(), 2);

        let counts = cached
            .active_photo_counts(&["u1".to_string(), "u2".to_string()])
            .await
            .unwrap();
        assert_eq!(counts.get("u1"), Some(&2));
        assert_eq!(counts.get("u2"), None);
        assert_eq!(cached.get_primary_photo("u1").await.unwrap().map(|p| p.id), Some("p1".to_string()));
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::photos("user123"), "photos:user123");
    }
}
