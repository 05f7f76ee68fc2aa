use std::time::Instant;
use surf::middleware::{Middleware, Next};
use surf::{Client, Request, Response};
use url::Url;

/// Query parameters whose values never reach the log.
const SECRET_PARAMS: &[&str] = &["client_id", "access_key", "key"];

/// Logs every outbound request with its status and latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct SurfLogging;

#[surf::utils::async_trait]
impl Middleware for SurfLogging {
    async fn handle(&self, req: Request, client: Client, next: Next<'_>) -> surf::Result<Response> {
        let method = req.method();
        let url = redact_url(req.url());
        let started = Instant::now();

        log::debug!("--> {} {}", method, url);
        match next.run(req, client).await {
            Ok(res) => {
                let status = res.status();
                let elapsed = started.elapsed();
                if status.is_success() {
                    log::debug!("<-- {} {} {} ({:?})", method, url, status, elapsed);
                } else {
                    log::warn!("<-- {} {} {} ({:?})", method, url, status, elapsed);
                }
                Ok(res)
            }
            Err(err) => {
                log::warn!("<-- {} {} failed after {:?}: {}", method, url, started.elapsed(), err);
                Err(err)
            }
        }
    }
}

/// Returns a copy of `url` with credential-bearing query values masked.
pub fn redact_url(url: &Url) -> Url {
    let mut redacted = url.clone();
    if url.query().is_none() {
        return redacted;
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if SECRET_PARAMS.contains(&name.as_ref()) {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_are_masked() {
        let url = Url::parse(
            "https://api.unsplash.com/search/photos?query=chambord&client_id=s3cr3t&orientation=landscape",
        )
        .unwrap();

        let redacted = redact_url(&url);
        let rendered = redacted.to_string();

        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("query=chambord"));
        assert!(rendered.contains("orientation=landscape"));
    }

    #[test]
    fn test_url_without_query_is_untouched() {
        let url = Url::parse("https://commons.wikimedia.org/w/api.php").unwrap();
        assert_eq!(redact_url(&url), url);
    }
}
