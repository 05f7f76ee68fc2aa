pub mod cache;
pub mod client;
pub mod config;
pub mod deduplication;
mod error;
mod event;
mod handle;
mod image;
pub mod relevance;
mod search_key;


use cache::{CacheStats, SearchCache, SharedSearchCache};
use client::commons::Commons;
use client::unsplash::Unsplash;
pub use client::{ImageProvider, SurfTransport, Transport};
pub use config::ImageClientConfig;
use dashmap::DashMap;
use deduplication::{
    DeduplicationStats, FlightKey, FlightOutcome, FlightRole, RequestDeduplicator,
    SharedRequestDeduplicator,
};
pub use error::{Error, Result};
pub use event::GalleryEvent;
pub use handle::{FetchHandles, ImageHandle};
pub use image::{ResolvedImage, Source};
pub use search_key::SearchKey;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::broadcast;

/// Advisory recorded against a key when one of its sources fails.
pub const IMAGES_UNAVAILABLE: &str = "Images unavailable";

const EVENT_CAPACITY: usize = 64;

/// Aggregates images for an entity name from Unsplash and Wikimedia Commons.
///
/// Each source is fetched, scored and cached independently; concurrent
/// requests for the same name and source share one outbound call. The client
/// is cheap to clone and every clone shares the same state.
#[derive(Clone)]
pub struct ImageClient {
    primary: Arc<dyn ImageProvider>,
    commons: Arc<dyn ImageProvider>,
    primary_cache: SharedSearchCache,
    commons_cache: SharedSearchCache,
    deduplicator: SharedRequestDeduplicator,
    loading: Arc<DashMap<SearchKey, usize>>,
    errors: Arc<DashMap<SearchKey, String>>,
    events: broadcast::Sender<GalleryEvent>,
}

impl Default for ImageClient {
    fn default() -> Self {
        Self::new(ImageClientConfig::default())
    }
}

impl ImageClient {
    /// Create a client talking to the real APIs
    pub fn new(config: ImageClientConfig) -> Self {
        let transport = Arc::new(SurfTransport::new(config.user_agent.clone()));
        Self::with_transport(config, transport)
    }

    /// Create a client whose providers go through `transport`
    pub fn with_transport(config: ImageClientConfig, transport: Arc<dyn Transport>) -> Self {
        let primary = Arc::new(Unsplash::new(transport.clone(), config.unsplash.clone()));
        let commons = Arc::new(Commons::new(transport, config.commons.clone()));
        Self::with_providers(primary, commons, config)
    }

    /// Create a client from arbitrary providers
    pub fn with_providers(
        primary: Arc<dyn ImageProvider>,
        commons: Arc<dyn ImageProvider>,
        config: ImageClientConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            primary,
            commons,
            primary_cache: Arc::new(SearchCache::new(Source::Primary, config.cache.clone())),
            commons_cache: Arc::new(SearchCache::new(Source::Commons, config.cache)),
            deduplicator: Arc::new(RequestDeduplicator::new(config.deduplication)),
            loading: Arc::new(DashMap::new()),
            errors: Arc::new(DashMap::new()),
            events,
        }
    }

    fn provider(&self, source: Source) -> &Arc<dyn ImageProvider> {
        match source {
            Source::Primary => &self.primary,
            Source::Commons => &self.commons,
        }
    }

    fn cache(&self, source: Source) -> &SharedSearchCache {
        match source {
            Source::Primary => &self.primary_cache,
            Source::Commons => &self.commons_cache,
        }
    }

    /// Start resolving images for `name`, one independent handle per source.
    ///
    /// Cached sources resolve immediately; the others are fetched in the
    /// background and published to the cache as they complete. A blank name
    /// resolves to empty lists without touching any state. Must be called
    /// from within a Tokio runtime.
    pub fn fetch(&self, name: &str, limit: usize) -> FetchHandles {
        let key = SearchKey::normalize(name);
        if key.is_empty() {
            return FetchHandles::empty();
        }

        FetchHandles {
            primary: self.spawn_source(Source::Primary, &key, name, limit),
            commons: self.spawn_source(Source::Commons, &key, name, limit),
        }
    }

    /// Fetch both sources and return the merged list.
    pub async fn fetch_all(&self, name: &str, limit: usize) -> Vec<ResolvedImage> {
        self.fetch(name, limit).join().await
    }

    /// Resolve a single source for `name` on the current task.
    pub async fn fetch_source(&self, source: Source, name: &str, limit: usize) -> Vec<ResolvedImage> {
        let key = SearchKey::normalize(name);
        if key.is_empty() {
            return Vec::new();
        }
        if let Some(images) = self.cached(source, &key) {
            return images;
        }

        let _loading = self.begin_loading(&key);
        self.resolve(source, key, name.trim().to_string(), limit).await
    }

    fn spawn_source(&self, source: Source, key: &SearchKey, name: &str, limit: usize) -> ImageHandle {
        if let Some(images) = self.cached(source, key) {
            return ImageHandle::ready(images);
        }

        let loading = self.begin_loading(key);
        let client = self.clone();
        let key = key.clone();
        let query = name.trim().to_string();
        ImageHandle::spawn(async move {
            let _loading = loading;
            client.resolve(source, key, query, limit).await
        })
    }

    /// A non-empty cached list; an empty one counts as a miss.
    fn cached(&self, source: Source, key: &SearchKey) -> Option<Vec<ResolvedImage>> {
        self.cache(source).get(key).filter(|images| !images.is_empty())
    }

    async fn resolve(&self, source: Source, key: SearchKey, query: String, limit: usize) -> Vec<ResolvedImage> {
        let flight = FlightKey::new(key.clone(), source);
        let (outcome, role) = self
            .deduplicator
            .execute(flight, || self.fetch_and_store(source, key.clone(), query, limit))
            .await;

        match outcome {
            FlightOutcome::Resolved(images) => {
                if role == FlightRole::Leader {
                    log::info!("Resolved {} {} images for '{}'", images.len(), source, key);
                    self.publish(GalleryEvent::Resolved {
                        key,
                        source,
                        count: images.len(),
                    });
                }
                images
            }
            FlightOutcome::Failed(reason) => {
                if role == FlightRole::Leader {
                    log::error!("{} fetch failed for '{}': {}", source, key, reason);
                    self.errors.insert(key.clone(), IMAGES_UNAVAILABLE.to_string());
                    self.publish(GalleryEvent::Failed {
                        key,
                        source,
                        message: IMAGES_UNAVAILABLE.to_string(),
                    });
                }
                Vec::new()
            }
        }
    }

    /// Runs only for the caller that owns the flight; the cache is written
    /// before the flight is released.
    async fn fetch_and_store(
        &self,
        source: Source,
        key: SearchKey,
        query: String,
        limit: usize,
    ) -> Result<Vec<ResolvedImage>> {
        // A flight for this pair may have completed between the cache check
        // and claiming the slot.
        if let Some(images) = self.cached(source, &key) {
            return Ok(images);
        }

        self.publish(GalleryEvent::Loading {
            key: key.clone(),
            source,
        });

        let provider = self.provider(source);
        log::debug!("Querying {} for '{}' (limit {})", provider.source(), query, limit);
        let mut images = provider.search(&query, limit).await?;
        images.retain(ResolvedImage::is_renderable);
        self.cache(source).put(key, images.clone());

        Ok(images)
    }

    /// Marks `key` as loading until the returned guard is dropped.
    fn begin_loading(&self, key: &SearchKey) -> LoadingGuard {
        *self.loading.entry(key.clone()).or_insert(0) += 1;
        LoadingGuard {
            loading: self.loading.clone(),
            key: key.clone(),
        }
    }

    fn publish(&self, event: GalleryEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Cached images for `name`: primary images first, then Commons images.
    /// Never triggers a request.
    pub fn images_for(&self, name: &str) -> Vec<ResolvedImage> {
        let key = SearchKey::normalize(name);
        let mut images = self.primary_cache.images(&key);
        images.extend(self.commons_cache.images(&key));
        images
    }

    /// Whether any source is still fetching for `name`.
    pub fn is_loading(&self, name: &str) -> bool {
        self.loading.contains_key(&SearchKey::normalize(name))
    }

    /// Last failure message recorded for `name`, if any.
    pub fn error_for(&self, name: &str) -> Option<String> {
        self.errors
            .get(&SearchKey::normalize(name))
            .map(|message| message.value().clone())
    }

    /// Subscribe to progress events for all keys.
    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    /// Get cache statistics for both sources
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        Source::iter().map(|source| self.cache(source).stats()).collect()
    }

    /// Get statistics about requests currently in flight
    pub fn dedup_stats(&self) -> DeduplicationStats {
        self.deduplicator.stats()
    }

    /// Clear both caches
    pub fn clear_cache(&self) {
        Source::iter().for_each(|source| self.cache(source).clear());
    }

    /// Evict expired cache entries from both caches
    pub fn evict_expired_cache(&self) {
        Source::iter().for_each(|source| self.cache(source).evict_expired());
    }
}

/// One outstanding source fetch for a key.
struct LoadingGuard {
    loading: Arc<DashMap<SearchKey, usize>>,
    key: SearchKey,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.loading.remove_if_mut(&self.key, |_, outstanding| {
            *outstanding = outstanding.saturating_sub(1);
            *outstanding == 0
        });
    }
}
