//! Cache-aside storage for expensive provider calls.
//!
//! [`CacheAside`] checks a [`CacheBackend`] before running a fetch and stores
//! successful results afterwards. Backend failures are logged and otherwise
//! ignored: a broken cache degrades to a slower pipeline, never a failing
//! one. When Redis is unreachable at startup the store is created disabled
//! and every call goes straight to the underlying fetch.

pub mod backend;
pub mod redis_cache;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{CacheBackend, CacheError, MemoryCache};
pub use redis_cache::{RedisCache, RedisConfig};

/// Default lifetime of a cached provider response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct CacheAside {
    backend: Option<Arc<dyn CacheBackend>>,
}

impl CacheAside {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store that never caches.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Connect to Redis, falling back to a disabled store if the server does
    /// not answer.
    pub async fn connect(config: Option<&RedisConfig>) -> Self {
        let Some(config) = config else {
            log::info!("Redis not configured, caching disabled");
            return Self::disabled();
        };
        match RedisCache::connect(config).await {
            Ok(cache) => {
                log::info!("Connected to Redis at {}:{}", config.host, config.port);
                Self::new(Arc::new(cache))
            }
            Err(e) => {
                log::warn!(
                    "Redis at {}:{} unavailable ({}), caching disabled",
                    config.host,
                    config.port,
                    e
                );
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Raw lookup. Errors and a disabled store both read as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Cache read for '{}' failed: {}", key, e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let Some(backend) = &self.backend else {
            return;
        };
        if let Err(e) = backend.set(key, value, ttl).await {
            log::warn!("Cache write for '{}' failed: {}", key, e);
        }
    }

    /// Typed lookup; an entry that no longer decodes is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                log::debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                log::debug!("Discarding undecodable cache entry '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if !self.is_enabled() {
            return;
        }
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => log::warn!("Could not serialize cache entry '{}': {}", key, e),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its
    /// successful result. Errors are returned uncached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_json(key).await {
            return Ok(cached);
        }
        let value = fetch().await?;
        self.set_json(key, &value, ttl).await;
        Ok(value)
    }
}

impl Default for CacheAside {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
