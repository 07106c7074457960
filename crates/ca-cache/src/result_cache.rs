//! Read-through cache for generated artifacts
//!
//! Cache faults never fail a request: a read error is a miss and a write
//! error is logged and dropped.

use crate::key::{cache_key, ArtifactKind};
use crate::store::{CacheStore, MemoryCacheStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default time-to-live for cached artifacts (24 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Result cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the cache at all
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Maximum entries held in memory
    pub max_capacity: u64,
}

impl CacheConfig {
    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Disabled cache
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: DEFAULT_TTL.as_secs(),
            max_capacity: 1_000,
        }
    }
}

/// Content-addressed read-through cache
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ResultCache {
    /// Create over a store with the default TTL
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
        }
    }

    /// In-memory cache from configuration, or `None` when disabled
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| {
            Self::new(Arc::new(MemoryCacheStore::new(config.max_capacity))).with_ttl(config.ttl())
        })
    }

    /// With entry lifetime
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached artifact for `prompt`, or generate and store it
    ///
    /// # Errors
    /// Only errors from `generate`; nothing is stored in that case.
    pub async fn get_or_generate<E, F, Fut>(
        &self,
        kind: ArtifactKind,
        prompt: &str,
        generate: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let key = cache_key(kind, prompt);

        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                tracing::debug!(%kind, key = %key, "cache hit");
                return Ok(cached);
            }
            Ok(None) => tracing::debug!(%kind, key = %key, "cache miss"),
            Err(err) => tracing::warn!(%kind, key = %key, error = %err, "failed to read cache"),
        }

        let value = generate().await?;

        if let Err(err) = self.store.put(&key, value.clone(), self.ttl).await {
            tracing::warn!(%kind, key = %key, error = %err, "failed to cache generated artifact");
        }
        Ok(value)
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
