use getset::Getters;
use image_search_client::ImageClient;
use log::info;
use std::sync::Arc;

use super::config::Config;

#[derive(Getters)]
#[get = "pub"]
pub struct Context {
    image_client: ImageClient,
    config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let client_config = config.image_client_config();
        info!(
            "Initialized ImageClient (cache TTL: {:?}, max entries: {}, request timeout: {}s)",
            client_config.cache.ttl,
            client_config.cache.max_entries,
            client_config.deduplication.request_timeout.num_seconds()
        );
        if config.unsplash().access_key.is_empty() {
            log::warn!("No Unsplash access key configured, only Commons images will be found");
        }

        Self {
            image_client: ImageClient::new(client_config),
            config,
        }
    }

    /// The limit used when a query does not ask for one.
    pub fn limit_or_default(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(*self.config.default_limit())
    }
}

pub type ContextPointer = Arc<Context>;
