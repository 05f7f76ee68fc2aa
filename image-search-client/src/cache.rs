use crate::image::{ResolvedImage, Source};
use crate::search_key::SearchKey;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Configuration for the per-source image caches
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// How long a resolved image list stays valid; `None` keeps it for the
    /// lifetime of the process
    pub ttl: Option<Duration>,
    /// Maximum number of keys cached per source
    pub max_entries: usize,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            max_entries: 1000,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with an expiry
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl: Some(ttl),
            max_entries,
            enabled: true,
        }
    }
}

/// Cached image list with metadata
#[derive(Clone, Debug)]
pub struct CachedResult {
    pub data: Vec<ResolvedImage>,
    pub created_at: DateTime<Utc>,
    pub ttl: Option<Duration>,
}

impl CachedResult {
    pub fn new(data: Vec<ResolvedImage>, ttl: Option<Duration>) -> Self {
        Self {
            data,
            created_at: Utc::now(),
            ttl,
        }
    }

    /// Check if the cached result is still valid
    pub fn is_valid(&self) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() < self.created_at + ttl,
            None => true,
        }
    }
}

/// In-memory image cache for one source, using DashMap for thread safety
pub struct SearchCache {
    source: Source,
    cache: DashMap<SearchKey, CachedResult>,
    pub config: CacheConfig,
}

impl SearchCache {
    pub fn new(source: Source, config: CacheConfig) -> Self {
        Self {
            source,
            cache: DashMap::new(),
            config,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Get the cached list if present and valid
    pub fn get(&self, key: &SearchKey) -> Option<Vec<ResolvedImage>> {
        if !self.config.enabled {
            return None;
        }

        if self
            .cache
            .remove_if(key, |_, cached| !cached.is_valid())
            .is_some()
        {
            log::debug!("{} cache expired for key: {}", self.source, key);
            return None;
        }

        match self.cache.get(key) {
            Some(cached) => {
                log::debug!("{} cache hit for key: {}", self.source, key);
                Some(cached.data.clone())
            }
            None => {
                log::debug!("{} cache miss for key: {}", self.source, key);
                None
            }
        }
    }

    /// Get the cached list, or an empty one when nothing is cached
    pub fn images(&self, key: &SearchKey) -> Vec<ResolvedImage> {
        self.get(key).unwrap_or_default()
    }

    /// Store a list in the cache, replacing whatever the key held
    pub fn put(&self, key: SearchKey, data: Vec<ResolvedImage>) {
        if !self.config.enabled {
            return;
        }

        // Check if we need to evict old entries
        if !self.cache.contains_key(&key) && self.cache.len() >= self.config.max_entries {
            self.evict_expired();

            // If still at capacity, remove oldest entries
            if self.cache.len() >= self.config.max_entries {
                self.evict_oldest();
            }
        }

        log::debug!(
            "Stored {} {} images for key: {}",
            data.len(),
            self.source,
            key
        );
        self.cache
            .insert(key, CachedResult::new(data, self.config.ttl));
    }

    /// Remove expired entries from cache
    pub fn evict_expired(&self) {
        let before = self.cache.len();
        self.cache.retain(|_, cached| cached.is_valid());

        log::debug!(
            "Evicted {} expired {} cache entries",
            before.saturating_sub(self.cache.len()),
            self.source
        );
    }

    /// Remove oldest entries when at capacity
    fn evict_oldest(&self) {
        let mut entries: Vec<_> = self
            .cache
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        // Sort by creation time (oldest first)
        entries.sort_by_key(|(_, created_at)| *created_at);

        // Remove oldest 25% of entries
        let to_remove = (self.config.max_entries / 4).max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.cache.remove(&key);
        }

        log::debug!("Evicted {} oldest {} cache entries", to_remove, self.source);
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        self.cache.clear();
        log::info!("{} cache cleared", self.source);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let total_entries = self.cache.len();
        let expired_entries = self
            .cache
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .count();
        let cached_images = self
            .cache
            .iter()
            .map(|entry| entry.value().data.len())
            .sum();

        CacheStats {
            source: self.source,
            total_entries,
            valid_entries: total_entries - expired_entries,
            expired_entries,
            cached_images,
            max_entries: self.config.max_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub source: Source,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub cached_images: usize,
    pub max_entries: usize,
}

/// Thread-safe wrapper for the cache
pub type SharedSearchCache = Arc<SearchCache>;
