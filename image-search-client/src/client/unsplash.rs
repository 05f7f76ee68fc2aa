use super::{with_query, ImageProvider, Transport};
use crate::error::Result;
use crate::image::{ResolvedImage, Source};
use crate::relevance::{self, Scored};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "https://api.unsplash.com/search/photos";

/// Unsplash asks for a pool three times larger than what is shown.
const POOL_FACTOR: usize = 3;

/// Largest `per_page` the search endpoint honours.
const MAX_PER_PAGE: usize = 30;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct UnsplashConfig {
    pub endpoint: String,
    pub access_key: String,
}

impl Default for UnsplashConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    urls: PhotoUrls,
    user: Option<PhotoUser>,
    links: Option<PhotoLinks>,
    alt_description: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoUrls {
    #[serde(default)]
    regular: String,
    #[serde(default)]
    thumb: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoLinks {
    html: Option<String>,
}

impl Photo {
    /// Alt text when present, otherwise the description.
    fn caption(&self) -> Option<&str> {
        [&self.alt_description, &self.description]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.is_empty())
    }

    fn author(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|user| user.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown author")
    }

    fn into_image(self, query: &str) -> ResolvedImage {
        let author = self.author().to_string();
        let alt_text = self
            .caption()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Photo by {}", author));
        let source_url = self.links.and_then(|links| links.html).unwrap_or_default();

        ResolvedImage::new(
            self.id,
            self.urls.regular,
            self.urls.thumb,
            author,
            source_url,
            alt_text,
            Source::Primary,
            None,
            query.to_string(),
        )
    }
}

/// Landscape photo search against the Unsplash API.
pub struct Unsplash {
    transport: Arc<dyn Transport>,
    config: UnsplashConfig,
}

impl Unsplash {
    pub fn new(transport: Arc<dyn Transport>, config: UnsplashConfig) -> Self {
        Self { transport, config }
    }

    fn request_url(&self, query: &str, limit: usize) -> String {
        let pool = limit.saturating_mul(POOL_FACTOR).min(MAX_PER_PAGE);
        with_query(
            &self.config.endpoint,
            &[
                ("query", query.to_string()),
                ("per_page", pool.to_string()),
                ("client_id", self.config.access_key.clone()),
                ("orientation", "landscape".to_string()),
            ],
        )
    }
}

#[async_trait]
impl ImageProvider for Unsplash {
    fn source(&self) -> Source {
        Source::Primary
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResolvedImage>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.transport.get_text(&self.request_url(query, limit)).await?;
        let response: SearchResponse = serde_json::from_str(&body)?;
        log::debug!(
            "Unsplash returned {} photos for '{}'",
            response.results.len(),
            query
        );

        Ok(select(response.results, query, limit))
    }
}

fn select(photos: Vec<Photo>, query: &str, limit: usize) -> Vec<ResolvedImage> {
    let tokens = relevance::tokenize(query);
    let scored = photos
        .into_iter()
        .filter(|photo| !photo.urls.regular.trim().is_empty())
        .map(|photo| {
            let score = relevance::score_photo(&tokens, photo.caption().unwrap_or_default());
            Scored::new(score, photo)
        })
        .collect();

    relevance::pick(scored, limit)
        .into_iter()
        .map(|photo| photo.into_image(query))
        .collect()
}
