//! Page sources the paging task fetches from.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use photo_model::Photo;
use thiserror::Error;
use tracing::debug;

/// Failure reported by a page source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("page {page} could not be fetched: {reason}")]
    Unavailable { page: u32, reason: String },

    #[error("page {page} could not be decoded: {reason}")]
    Malformed { page: u32, reason: String },
}

/// Supplies the remote photo list one page at a time.
///
/// Pages are 1-based. A page shorter than `per_page` marks the end of the
/// list.
pub trait PageSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send;
}

impl<S: PageSource> PageSource for std::sync::Arc<S> {
    fn fetch_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send {
        (**self).fetch_page(page, per_page)
    }
}

fn page_slice(photos: &[Photo], page: u32, per_page: usize) -> Vec<Photo> {
    let start = (page.saturating_sub(1) as usize).saturating_mul(per_page);
    photos
        .iter()
        .skip(start)
        .take(per_page)
        .cloned()
        .collect()
}

/// In-memory source with optional latency and injectable failures.
#[derive(Debug, Default)]
pub struct MemorySource {
    photos: Vec<Photo>,
    latency: Duration,
    failures: AtomicUsize,
    requests: AtomicUsize,
}

impl MemorySource {
    pub fn new(photos: Vec<Photo>) -> Self {
        Self {
            photos,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes the next `count` requests fail.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of page requests served so far, failed ones included.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl PageSource for MemorySource {
    fn fetch_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send {
        async move {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.take_failure() {
                return Err(FetchError::Unavailable {
                    page,
                    reason: "injected failure".to_string(),
                });
            }
            Ok(page_slice(&self.photos, page, per_page))
        }
    }
}

/// Reads a JSON array of photos from disk on every request and pages over it.
///
/// The file is re-read each time so edits show up on the next refresh, the
/// way a remote listing would change between requests.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parses a photo listing in the Unsplash `GET /photos` shape.
pub fn read_photo_list(path: &Path) -> crate::Result<Vec<Photo>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

impl PageSource for JsonFileSource {
    fn fetch_page(
        &self,
        page: u32,
        per_page: usize,
    ) -> impl Future<Output = Result<Vec<Photo>, FetchError>> + Send {
        let path = self.path.clone();
        async move {
            let listing = tokio::task::spawn_blocking(move || read_photo_list(&path))
                .await
                .map_err(|err| FetchError::Unavailable {
                    page,
                    reason: err.to_string(),
                })?;
            let photos = listing.map_err(|err| match err {
                crate::Error::Json(err) => FetchError::Malformed {
                    page,
                    reason: err.to_string(),
                },
                other => FetchError::Unavailable {
                    page,
                    reason: other.to_string(),
                },
            })?;
            let slice = page_slice(&photos, page, per_page);
            debug!(page, returned = slice.len(), total = photos.len(), "json page served");
            Ok(slice)
        }
    }
}
