pub mod commons;
pub mod unsplash;

use crate::error::{Error, Result};
use crate::image::{ResolvedImage, Source};
use async_trait::async_trait;
use surf::http::headers::USER_AGENT;
use surf::Client;
use utils::surf_logging::SurfLogging;

/// Minimal HTTP seam the source clients talk through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET against `url` and returns the body of a 2xx response.
    async fn get_text(&self, url: &str) -> Result<String>;
}

/// A search provider that turns an entity name into displayable images.
///
/// Providers are stateless: they never cache or remember earlier calls.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn source(&self) -> Source;

    /// Searches for `query` and returns at most `limit` ranked images.
    /// A blank query yields an empty list without any outbound call.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResolvedImage>>;
}

/// [`Transport`] backed by a `surf` client with request logging.
#[derive(Clone)]
pub struct SurfTransport {
    http: Client,
    user_agent: String,
}

impl SurfTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            http: Client::new().with(SurfLogging),
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl Transport for SurfTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let mut response = self
            .http
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: u16::from(status),
                url: without_query(url).to_string(),
            });
        }

        Ok(response.body_string().await?)
    }
}

/// Appends percent-encoded query parameters to `endpoint`.
pub(crate) fn with_query(endpoint: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", endpoint, query)
}

fn without_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
