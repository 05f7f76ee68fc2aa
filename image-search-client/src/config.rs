use crate::cache::CacheConfig;
use crate::client::commons::CommonsConfig;
use crate::client::unsplash::UnsplashConfig;
use crate::deduplication::DeduplicationConfig;

const DEFAULT_USER_AGENT: &str = concat!(
    "heritage-gallery/",
    env!("CARGO_PKG_VERSION"),
    " (image-search-client)"
);

/// Everything needed to build an [`crate::ImageClient`].
#[derive(Clone, Debug)]
pub struct ImageClientConfig {
    /// Sent with every outbound request; Wikimedia rejects generic agents.
    pub user_agent: String,
    pub unsplash: UnsplashConfig,
    pub commons: CommonsConfig,
    pub cache: CacheConfig,
    pub deduplication: DeduplicationConfig,
}

impl Default for ImageClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            unsplash: UnsplashConfig::default(),
            commons: CommonsConfig::default(),
            cache: CacheConfig::default(),
            deduplication: DeduplicationConfig::default(),
        }
    }
}
