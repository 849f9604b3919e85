//! Injected preference cache.
//!
//! Values are replaced whole; concurrent writers for the same session are
//! last-writer-wins, which at worst costs a redundant reload.

use crate::models::UserPreferences;
use async_trait::async_trait;
use moka::future::Cache;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[async_trait]
pub trait PreferenceCache: Send + Sync {
    async fn get(&self, session_id: &str) -> CacheResult<Option<UserPreferences>>;
    async fn put(&self, session_id: &str, preferences: UserPreferences) -> CacheResult<()>;
    async fn invalidate(&self, session_id: &str) -> CacheResult<()>;
}

/// Bounded in-process cache with TTL eviction.
#[derive(Clone)]
pub struct MokaPreferenceCache {
    cache: Cache<String, Arc<UserPreferences>>,
}

impl MokaPreferenceCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl PreferenceCache for MokaPreferenceCache {
    async fn get(&self, session_id: &str) -> CacheResult<Option<UserPreferences>> {
        Ok(self
            .cache
            .get(session_id)
            .await
            .map(|prefs| prefs.as_ref().clone()))
    }

    async fn put(&self, session_id: &str, preferences: UserPreferences) -> CacheResult<()> {
        self.cache
            .insert(session_id.to_string(), Arc::new(preferences))
            .await;
        Ok(())
    }

    async fn invalidate(&self, session_id: &str) -> CacheResult<()> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }
}

/// Shared cache in Redis, JSON-encoded under `reco:prefs:{session_id}`.
#[derive(Clone)]
pub struct RedisPreferenceCache {
    conn: ConnectionManager,
    ttl: Duration,
}

impl RedisPreferenceCache {
    pub async fn connect(client: redis::Client, ttl: Duration) -> CacheResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, ttl })
    }

    fn key(session_id: &str) -> String {
        format!("reco:prefs:{}", session_id)
    }
}

#[async_trait]
impl PreferenceCache for RedisPreferenceCache {
    async fn get(&self, session_id: &str) -> CacheResult<Option<UserPreferences>> {
        let key = Self::key(session_id);
        let mut conn = self.conn.clone();

        let raw: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<UserPreferences>(&raw) {
            Ok(prefs) => Ok(Some(prefs)),
            Err(e) => {
                // Corrupted entry, drop it and report a miss
                warn!(session_id = %session_id, error = %e, "Discarding corrupted cached preferences");
                let _: () = redis::cmd("DEL").arg(&key).query_async(&mut conn).await?;
                Ok(None)
            }
        }
    }

    async fn put(&self, session_id: &str, preferences: UserPreferences) -> CacheResult<()> {
        let payload = serde_json::to_string(&preferences)?;
        let mut conn = self.conn.clone();

        let _: () = redis::cmd("SET")
            .arg(Self::key(session_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        debug!(session_id = %session_id, "Cached preferences in Redis");
        Ok(())
    }

    async fn invalidate(&self, session_id: &str) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(Self::key(session_id))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs_with(category: &str) -> UserPreferences {
        let mut prefs = UserPreferences::default();
        prefs.categories.insert(category.to_string(), 3);
        prefs
    }

    #[tokio::test]
    async fn test_moka_put_get_invalidate() {
        let cache = MokaPreferenceCache::new(100, Duration::from_secs(60));

        assert!(cache.get("s1").await.unwrap().is_none());

        cache.put("s1", prefs_with("Books")).await.unwrap();
        let cached = cache.get("s1").await.unwrap().unwrap();
        assert_eq!(cached.categories.get("Books"), Some(&3));

        cache.invalidate("s1").await.unwrap();
        assert!(cache.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_moka_last_writer_wins() {
        let cache = MokaPreferenceCache::new(100, Duration::from_secs(60));

        cache.put("s1", prefs_with("Books")).await.unwrap();
        cache.put("s1", prefs_with("Games")).await.unwrap();

        let cached = cache.get("s1").await.unwrap().unwrap();
        assert!(cached.categories.contains_key("Games"));
        assert!(!cached.categories.contains_key("Books"));
    }

    #[test]
    fn test_redis_key_format() {
        assert_eq!(RedisPreferenceCache::key("abc"), "reco:prefs:abc");
    }
}
