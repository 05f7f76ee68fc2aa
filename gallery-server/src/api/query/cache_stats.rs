use super::super::get_context;
use async_graphql::{Context, Object, SimpleObject};
use image_search_client::cache::CacheStats;
use serde::Serialize;

#[derive(Default)]
pub struct CacheStatsQuery;

#[derive(SimpleObject, Serialize)]
pub struct CacheStatsResponse {
    pub cache_stats: Vec<CacheStats>,
    pub pending_requests: usize,
    pub waiting_requests: usize,
}

#[Object]
impl CacheStatsQuery {
    /// Get current cache statistics
    async fn cache_stats<'ctx>(&self, context: &Context<'ctx>) -> CacheStatsResponse {
        let client = get_context(context).image_client();
        let dedup = client.dedup_stats();

        CacheStatsResponse {
            cache_stats: client.cache_stats(),
            pending_requests: dedup.pending_requests,
            waiting_requests: dedup.total_waiters,
        }
    }

    /// Clear the cache (useful for debugging/admin)
    async fn clear_cache<'ctx>(&self, context: &Context<'ctx>) -> bool {
        get_context(context).image_client().clear_cache();
        true
    }
}
