use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use getset::Getters;
use image_search_client::cache::CacheConfig;
use image_search_client::client::commons::CommonsConfig;
use image_search_client::client::unsplash::UnsplashConfig;
use image_search_client::deduplication::DeduplicationConfig;
use image_search_client::ImageClientConfig;
use log::LevelFilter;
use serde::Deserialize;
use serde_inline_default::serde_inline_default;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone, Getters)]
#[get = "pub"]
pub struct CacheSettings {
    /// Seconds a resolved list stays cached; absent means forever
    #[serde(default)]
    ttl_secs: Option<u64>,
    #[serde_inline_default(1000)]
    max_entries: usize,
    #[serde_inline_default(true)]
    enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: None,
            max_entries: 1000,
            enabled: true,
        }
    }
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone, Getters)]
#[get = "pub"]
pub struct RequestSettings {
    #[serde_inline_default(30)]
    timeout_secs: u64,
    #[serde_inline_default(true)]
    deduplicate: bool,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            deduplicate: true,
        }
    }
}

#[serde_inline_default]
#[derive(Deserialize, Debug, Clone, Getters)]
#[get = "pub"]
pub struct Config {
    #[serde_inline_default("info".to_string())]
    log_level: String,
    #[serde(default)]
    user_agent: Option<String>,
    #[serde_inline_default(2)]
    default_limit: usize,
    #[serde(default)]
    unsplash: UnsplashConfig,
    #[serde(default)]
    commons: CommonsConfig,
    #[serde(default)]
    cache: CacheSettings,
    #[serde(default)]
    requests: RequestSettings,
}

impl Config {
    /// Reads `path` (if it exists) and overlays `GALLERY_*` environment
    /// variables; nested keys are separated by `__`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(
            Figment::new()
                .merge(Yaml::file(path.as_ref()))
                .merge(Env::prefixed("GALLERY_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|err| ConfigError::from(Box::new(err)))
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn image_client_config(&self) -> ImageClientConfig {
        let defaults = ImageClientConfig::default();

        ImageClientConfig {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            unsplash: self.unsplash.clone(),
            commons: self.commons.clone(),
            cache: CacheConfig {
                ttl: self
                    .cache
                    .ttl_secs
                    .map(|secs| chrono::Duration::seconds(secs as i64)),
                max_entries: self.cache.max_entries,
                enabled: self.cache.enabled,
            },
            deduplication: DeduplicationConfig {
                request_timeout: chrono::Duration::seconds(self.requests.timeout_secs as i64),
                enabled: self.requests.deduplicate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempdir::TempDir;

    fn load_yaml(yaml: &str) -> Config {
        let dir = TempDir::new("gallery-config").unwrap();
        let path = dir.path().join("gallery.yaml");
        fs::write(&path, yaml).unwrap();
        Config::from_figment(Figment::new().merge(Yaml::file(&path))).unwrap()
    }

    #[test]
    fn test_defaults_apply_to_empty_file() {
        let config = load_yaml("{}");

        assert_eq!(config.default_limit(), &2);
        assert_eq!(config.level_filter(), LevelFilter::Info);
        assert!(config.unsplash().access_key.is_empty());
        assert_eq!(config.commons().thumb_width, 1280);

        let client_config = config.image_client_config();
        assert_eq!(client_config.cache.ttl, None);
        assert_eq!(client_config.cache.max_entries, 1000);
        assert_eq!(client_config.deduplication.request_timeout.num_seconds(), 30);
        assert!(client_config.user_agent.starts_with("heritage-gallery/"));
    }

    #[test]
    fn test_file_values_are_used() {
        let config = load_yaml(
            r#"
log_level: debug
user_agent: "heritage-gallery/test (ops@example.org)"
default_limit: 4
unsplash:
  access_key: abc123
cache:
  ttl_secs: 3600
  max_entries: 50
requests:
  timeout_secs: 5
  deduplicate: false
"#,
        );

        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.default_limit(), &4);

        let client_config = config.image_client_config();
        assert_eq!(client_config.unsplash.access_key, "abc123");
        assert_eq!(
            client_config.unsplash.endpoint,
            "https://api.unsplash.com/search/photos"
        );
        assert_eq!(client_config.user_agent, "heritage-gallery/test (ops@example.org)");
        assert_eq!(client_config.cache.ttl, Some(chrono::Duration::hours(1)));
        assert_eq!(client_config.cache.max_entries, 50);
        assert!(client_config.cache.enabled);
        assert_eq!(client_config.deduplication.request_timeout.num_seconds(), 5);
        assert!(!client_config.deduplication.enabled);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let dir = TempDir::new("gallery-config").unwrap();
        let path = dir.path().join("gallery.yaml");
        fs::write(&path, "default_limit: many\n").unwrap();

        let result = Config::from_figment(Figment::new().merge(Yaml::file(&path)));
        assert!(matches!(result, Err(ConfigError::Figment(_))));
    }
}
