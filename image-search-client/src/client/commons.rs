use super::{with_query, ImageProvider, Transport};
use crate::error::{Error, Result};
use crate::image::{ResolvedImage, Source};
use crate::relevance::{self, Scored};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";

/// Commons results are noisier than Unsplash, so the pool is wider.
const POOL_FACTOR: usize = 6;

/// Largest `gsrlimit` allowed for regular clients.
const MAX_PER_PAGE: usize = 500;

/// MediaWiki namespace holding files.
const FILE_NAMESPACE: &str = "6";

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CommonsConfig {
    pub endpoint: String,
    pub thumb_width: u32,
}

impl Default for CommonsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            thumb_width: 1280,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    pageid: u64,
    /// Search rank, reported by generator=search.
    index: Option<u32>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
    #[serde(default)]
    width: u32,
    descriptionurl: Option<String>,
    #[serde(default)]
    extmetadata: ExtMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ExtMetadata {
    #[serde(rename = "Artist")]
    artist: Option<MetadataValue>,
    #[serde(rename = "LicenseShortName")]
    license_short_name: Option<MetadataValue>,
}

#[derive(Debug, Deserialize)]
struct MetadataValue {
    #[serde(default)]
    value: Value,
}

impl MetadataValue {
    fn text(&self) -> Option<&str> {
        self.value.as_str().filter(|value| !value.trim().is_empty())
    }
}

impl Page {
    fn info(&self) -> Option<&ImageInfo> {
        self.imageinfo.first()
    }

    fn url(&self) -> Option<&str> {
        self.info()
            .and_then(|info| info.url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    fn width(&self) -> u32 {
        self.info().map(|info| info.width).unwrap_or_default()
    }

    fn into_image(self, query: &str) -> Option<ResolvedImage> {
        let url = self.url()?.to_string();
        let info = self.info()?;

        let author = info
            .extmetadata
            .artist
            .as_ref()
            .and_then(MetadataValue::text)
            .map(strip_html)
            .filter(|artist| !artist.is_empty())
            .unwrap_or_else(|| "Unknown author".to_string());
        let license = info
            .extmetadata
            .license_short_name
            .as_ref()
            .and_then(MetadataValue::text)
            .map(str::to_string);
        let source_url = info.descriptionurl.clone().unwrap_or_default();
        let alt_text = match strip_file_prefix(&self.title) {
            "" => format!("Image of {}", query),
            title => title.to_string(),
        };

        Some(ResolvedImage::new(
            self.pageid.to_string(),
            url.clone(),
            url,
            author,
            source_url,
            alt_text,
            Source::Commons,
            license,
            query.to_string(),
        ))
    }
}

fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").trim().to_string()
}

fn strip_file_prefix(title: &str) -> &str {
    title.strip_prefix("File:").unwrap_or(title).trim()
}

/// File search against the Wikimedia Commons action API.
pub struct Commons {
    transport: Arc<dyn Transport>,
    config: CommonsConfig,
}

impl Commons {
    pub fn new(transport: Arc<dyn Transport>, config: CommonsConfig) -> Self {
        Self { transport, config }
    }

    fn request_url(&self, query: &str, limit: usize) -> String {
        let pool = limit.saturating_mul(POOL_FACTOR).min(MAX_PER_PAGE);
        with_query(
            &self.config.endpoint,
            &[
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("origin", "*".to_string()),
                ("generator", "search".to_string()),
                ("gsrsearch", format!("\"{}\"", query)),
                ("gsrlimit", pool.to_string()),
                ("gsrnamespace", FILE_NAMESPACE.to_string()),
                ("prop", "imageinfo".to_string()),
                ("iiprop", "url|size|extmetadata".to_string()),
                ("iiurlwidth", self.config.thumb_width.to_string()),
            ],
        )
    }
}

#[async_trait]
impl ImageProvider for Commons {
    fn source(&self) -> Source {
        Source::Commons
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ResolvedImage>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.transport.get_text(&self.request_url(query, limit)).await?;
        let pages = parse_pages(&body)?;
        log::debug!("Commons returned {} pages for '{}'", pages.len(), query);

        Ok(select(pages, query, limit))
    }
}

/// Decodes the page collection in search-rank order.
fn parse_pages(body: &str) -> Result<Vec<Page>> {
    let response: QueryResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(Error::Api(format!("{}: {}", error.code, error.info)));
    }

    let raw_pages = response.query.map(|query| query.pages).unwrap_or_default();
    let mut pages: Vec<Page> = raw_pages
        .into_iter()
        .filter_map(|(id, raw)| match serde_json::from_value::<Page>(raw) {
            Ok(page) => Some(page),
            Err(err) => {
                log::warn!("Skipping undecodable Commons page {}: {}", id, err);
                None
            }
        })
        .collect();
    pages.sort_by_key(|page| page.index.unwrap_or(u32::MAX));

    Ok(pages)
}

fn select(pages: Vec<Page>, query: &str, limit: usize) -> Vec<ResolvedImage> {
    let tokens = relevance::tokenize(query);
    let scored = pages
        .into_iter()
        .map(|page| {
            let score = relevance::score_commons_page(
                &tokens,
                &page.title,
                page.width(),
                page.url().is_some(),
            );
            Scored::new(score, page)
        })
        .collect();

    relevance::pick(scored, limit)
        .into_iter()
        .filter_map(|page| page.into_image(query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(id: u64, index: u32, title: &str, url: Option<&str>, width: u32) -> Value {
        json!({
            "pageid": id,
            "ns": 6,
            "title": title,
            "index": index,
            "imagerepository": "local",
            "imageinfo": [{
                "url": url,
                "width": width,
                "height": 800,
                "descriptionurl": format!("https://commons.wikimedia.org/wiki/{}", title),
                "extmetadata": {
                    "Artist": { "value": "<a href=\"//commons.wikimedia.org/wiki/User:Zairon\">Zairon</a>", "source": "commons-desc-page" },
                    "LicenseShortName": { "value": "CC BY-SA 4.0", "source": "commons-desc-page" }
                }
            }]
        })
    }

    fn body(pages: Vec<Value>) -> String {
        let mut map = Map::new();
        for page in pages {
            map.insert(page["pageid"].to_string(), page);
        }
        json!({ "batchcomplete": "", "query": { "pages": map } }).to_string()
    }

    #[test]
    fn test_mapping_fields() {
        let pages = parse_pages(&body(vec![page(
            42,
            1,
            "File:Chateau de Chambord.jpg",
            Some("https://upload.wikimedia.org/chambord.jpg"),
            4000,
        )]))
        .unwrap();
        let images = select(pages, "Château de Chambord", 2);

        assert_eq!(images.len(), 1);
        let image = &images[0];
        assert_eq!(image.id(), "42");
        assert_eq!(image.full_url(), "https://upload.wikimedia.org/chambord.jpg");
        assert_eq!(image.thumb_url(), image.full_url());
        assert_eq!(image.author(), "Zairon");
        assert_eq!(
            image.source_url(),
            "https://commons.wikimedia.org/wiki/File:Chateau de Chambord.jpg"
        );
        assert_eq!(image.alt_text(), "Chateau de Chambord.jpg");
        assert_eq!(image.license().as_deref(), Some("CC BY-SA 4.0"));
        assert_eq!(*image.source(), Source::Commons);
    }

    #[test]
    fn test_metadata_fallbacks() {
        let mut raw = page(7, 1, "", Some("https://upload.wikimedia.org/x.jpg"), 900);
        raw["imageinfo"][0]["extmetadata"] = json!({});
        let images = select(parse_pages(&body(vec![raw])).unwrap(), "Pont du Gard", 1);

        assert_eq!(images[0].author(), "Unknown author");
        assert_eq!(images[0].alt_text(), "Image of Pont du Gard");
        assert_eq!(images[0].license(), &None);
    }

    #[test]
    fn test_page_without_url_is_never_selected() {
        // Best title match, but nothing to render.
        let pages = parse_pages(&body(vec![
            page(1, 1, "File:Pont du Gard panorama.jpg", None, 5000),
            page(2, 2, "File:Roman aqueduct.jpg", Some("https://upload.wikimedia.org/a.jpg"), 1200),
        ]))
        .unwrap();

        let images = select(pages, "Pont du Gard", 2);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id(), "2");
    }

    #[test]
    fn test_logo_loses_to_photo() {
        let pages = parse_pages(&body(vec![
            page(1, 1, "File:Chambord_logo.svg", Some("https://upload.wikimedia.org/logo.svg"), 512),
            page(
                2,
                2,
                "File:Chateau_de_Chambord_aerial.jpg",
                Some("https://upload.wikimedia.org/aerial.jpg"),
                1200,
            ),
        ]))
        .unwrap();

        let images = select(pages, "Château de Chambord", 1);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id(), "2");
    }

    #[test]
    fn test_pages_follow_search_rank() {
        let pages = parse_pages(&body(vec![
            page(10, 3, "File:c.jpg", Some("https://u/c.jpg"), 100),
            page(20, 1, "File:a.jpg", Some("https://u/a.jpg"), 100),
            page(30, 2, "File:b.jpg", Some("https://u/b.jpg"), 100),
        ]))
        .unwrap();

        let ids: Vec<u64> = pages.iter().map(|page| page.pageid).collect();
        assert_eq!(ids, vec![20, 30, 10]);
    }

    #[test]
    fn test_empty_and_error_responses() {
        assert!(parse_pages(r#"{"batchcomplete":""}"#).unwrap().is_empty());

        let err = parse_pages(r#"{"error":{"code":"badvalue","info":"Unrecognized value"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Api(_)));

        assert!(matches!(parse_pages("<html>"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_request_url() {
        struct Unused;

        #[async_trait]
        impl Transport for Unused {
            async fn get_text(&self, _url: &str) -> Result<String> {
                unreachable!()
            }
        }

        let client = Commons::new(Arc::new(Unused), CommonsConfig::default());
        let url = client.request_url("Pont du Gard", 2);

        assert!(url.starts_with("https://commons.wikimedia.org/w/api.php?action=query&format=json"));
        assert!(url.contains("generator=search"));
        assert!(url.contains("gsrsearch=%22Pont%20du%20Gard%22"));
        assert!(url.contains("gsrlimit=12"));
        assert!(url.contains("gsrnamespace=6"));
        assert!(url.contains("iiprop=url%7Csize%7Cextmetadata"));
        assert!(url.contains("iiurlwidth=1280"));

        assert!(client.request_url("Pont du Gard", 100).contains("gsrlimit=500"));
        assert!(client.request_url("Pont du Gard", usize::MAX).contains("gsrlimit=500"));
    }
}
