use super::super::get_context;
use async_graphql::{Context, Object, SimpleObject};
use image_search_client::{ResolvedImage, SearchKey, Source};

#[derive(SimpleObject)]
pub struct GalleryImage {
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

impl From<&ResolvedImage> for GalleryImage {
    fn from(image: &ResolvedImage) -> Self {
        Self {
            id: image.id().clone(),
            full_url: image.full_url().clone(),
            thumb_url: image.thumb_url().clone(),
            author: image.author().clone(),
            source_url: image.source_url().clone(),
            alt_text: image.alt_text().clone(),
            source: *image.source(),
            license: image.license().clone(),
            source_query: image.source_query().clone(),
        }
    }
}

#[derive(SimpleObject)]
pub struct ImageStatus {
    key: String,
    loading: bool,
    error: Option<String>,
    cached_images: usize,
}

fn to_gallery(images: &[ResolvedImage]) -> Vec<GalleryImage> {
    images.iter().map(GalleryImage::from).collect()
}

#[derive(Default)]
pub struct ImagesQuery;

#[Object]
impl ImagesQuery {
    /// Fetch images for a heritage site, waiting for both sources
    async fn images<'ctx>(
        &self,
        context: &Context<'ctx>,
        name: String,
        limit: Option<usize>,
    ) -> Vec<GalleryImage> {
        let ctx = get_context(context);
        let limit = ctx.limit_or_default(limit);
        to_gallery(&ctx.image_client().fetch_all(&name, limit).await)
    }

    /// Images already cached for a heritage site, without fetching
    async fn cached_images<'ctx>(&self, context: &Context<'ctx>, name: String) -> Vec<GalleryImage> {
        to_gallery(&get_context(context).image_client().images_for(&name))
    }

    /// Loading and error state for a heritage site
    async fn image_status<'ctx>(&self, context: &Context<'ctx>, name: String) -> ImageStatus {
        let client = get_context(context).image_client();

        ImageStatus {
            key: SearchKey::normalize(&name).to_string(),
            loading: client.is_loading(&name),
            error: client.error_for(&name),
            cached_images: client.images_for(&name).len(),
        }
    }
}
