use crate::image::ResolvedImage;
use futures::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::task::JoinHandle;

/// Eventual image list for one source.
///
/// Resolves to an empty list when the source failed; it never errors.
#[derive(Debug)]
pub struct ImageHandle {
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Ready(Option<Vec<ResolvedImage>>),
    Spawned(JoinHandle<Vec<ResolvedImage>>),
}

impl ImageHandle {
    pub(crate) fn ready(images: Vec<ResolvedImage>) -> Self {
        Self {
            state: HandleState::Ready(Some(images)),
        }
    }

    pub(crate) fn empty() -> Self {
        Self::ready(Vec::new())
    }

    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Vec<ResolvedImage>> + Send + 'static,
    {
        Self {
            state: HandleState::Spawned(tokio::spawn(future)),
        }
    }

    /// True when the value was available without waiting on the network.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }
}

impl Future for ImageHandle {
    type Output = Vec<ResolvedImage>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            HandleState::Ready(images) => Poll::Ready(images.take().unwrap_or_default()),
            HandleState::Spawned(task) => Pin::new(task).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    log::error!("Image task did not complete: {}", err);
                    Vec::new()
                })
            }),
        }
    }
}

/// Independent per-source handles returned by [`crate::ImageClient::fetch`].
#[derive(Debug)]
pub struct FetchHandles {
    pub primary: ImageHandle,
    pub commons: ImageHandle,
}

impl FetchHandles {
    pub(crate) fn empty() -> Self {
        Self {
            primary: ImageHandle::empty(),
            commons: ImageHandle::empty(),
        }
    }

    /// Waits for both sources and concatenates primary then commons images.
    pub async fn join(self) -> Vec<ResolvedImage> {
        let (mut primary, commons) = futures::join!(self.primary, self.commons);
        primary.extend(commons);
        primary
    }
}
