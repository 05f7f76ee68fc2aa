use crate::image::Source;
use crate::search_key::SearchKey;

/// Progress notifications published by [`crate::ImageClient`] as each source
/// resolves. Only the request that actually went out publishes; callers that
/// joined it stay silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    Loading {
        key: SearchKey,
        source: Source,
    },
    Resolved {
        key: SearchKey,
        source: Source,
        count: usize,
    },
    Failed {
        key: SearchKey,
        source: Source,
        message: String,
    },
}

impl GalleryEvent {
    pub fn key(&self) -> &SearchKey {
        match self {
            GalleryEvent::Loading { key, .. }
            | GalleryEvent::Resolved { key, .. }
            | GalleryEvent::Failed { key, .. } => key,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            GalleryEvent::Loading { source, .. }
            | GalleryEvent::Resolved { source, .. }
            | GalleryEvent::Failed { source, .. } => *source,
        }
    }
}
