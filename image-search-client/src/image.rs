use getset::Getters;
use serde::Serialize;
use strum_macros::{Display, EnumIter};

#[cfg(feature = "graphql")]
use async_graphql::Enum;

/// The external providers images are aggregated from.
#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Display, EnumIter,
)]
#[cfg_attr(feature = "graphql", derive(Enum))]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    /// Unsplash photo search.
    Primary,
    /// Wikimedia Commons file search.
    Commons,
}

/// One displayable image, already scored and selected. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
#[get = "pub"]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImage {
    id: String,
    full_url: String,
    thumb_url: String,
    author: String,
    source_url: String,
    alt_text: String,
    source: Source,
    license: Option<String>,
    source_query: String,
}

impl ResolvedImage {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        full_url: String,
        thumb_url: String,
        author: String,
        source_url: String,
        alt_text: String,
        source: Source,
        license: Option<String>,
        source_query: String,
    ) -> Self {
        Self {
            id,
            full_url,
            thumb_url,
            author,
            source_url,
            alt_text,
            source,
            license,
            source_query,
        }
    }

    /// Images without a full-size URL cannot be rendered and are never cached.
    pub fn is_renderable(&self) -> bool {
        !self.full_url.trim().is_empty()
    }
}
