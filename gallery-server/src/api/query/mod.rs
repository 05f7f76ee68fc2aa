mod cache_stats;
mod images;

use async_graphql::MergedObject;
use cache_stats::CacheStatsQuery;
use images::ImagesQuery;

#[derive(MergedObject, Default)]
pub struct Query(ImagesQuery, CacheStatsQuery);
