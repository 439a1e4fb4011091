//! Grid controller: cells, load presentation, tap handling and scroll sync.

use std::time::Duration;

use photo_model::{PhotoId, UrlVariant};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::Navigation;
use crate::paging::{LoadState, PagerHandle, Snapshot};
use crate::selection::SelectionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub index: usize,
    pub id: PhotoId,
    /// Thumbnail URL; a cell without one still occupies its index.
    pub url: Option<String>,
}

/// What the grid shows for the current refresh state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GalleryLoad {
    /// Blocking progress indicator over the grid.
    Loading,
    /// Grid stays usable; the failure is reported through a transient notice.
    Error(String),
    #[default]
    Ready,
}

impl GalleryLoad {
    pub fn from_refresh(refresh: &LoadState) -> Self {
        match refresh {
            LoadState::Loading => Self::Loading,
            LoadState::Error(message) => Self::Error(message.clone()),
            LoadState::Idle | LoadState::EndOfData => Self::Ready,
        }
    }

    pub fn shows_progress(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryView {
    pub cells: Vec<GridCell>,
    pub load: GalleryLoad,
}

impl GalleryView {
    pub fn build(snapshot: &Snapshot, refresh: &LoadState, variant: UrlVariant) -> Self {
        let cells = snapshot
            .iter()
            .enumerate()
            .map(|(index, photo)| GridCell {
                index,
                id: photo.id.clone(),
                url: photo.url(variant).map(str::to_owned),
            })
            .collect();
        Self {
            cells,
            load: GalleryLoad::from_refresh(refresh),
        }
    }
}

/// Emits one notice per transition of the refresh state into `Error`.
#[derive(Debug, Default)]
pub struct ErrorNotices {
    last: LoadState,
}

impl ErrorNotices {
    pub fn observe(&mut self, refresh: &LoadState) -> Option<String> {
        let notice = match refresh {
            LoadState::Error(message) if !self.last.is_error() => Some(message.clone()),
            _ => None,
        };
        self.last = refresh.clone();
        notice
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ScrollTarget {
    None,
    /// Selected id is not loaded yet; scroll once it shows up.
    Pending {
        id: PhotoId,
        session: u64,
        deadline: Instant,
    },
    /// Scroll already issued for this id in this session.
    Settled { id: PhotoId, session: u64 },
    /// Waited too long, or the list was refreshed while waiting.
    Abandoned { id: PhotoId, session: u64 },
}

impl ScrollTarget {
    fn matches(&self, target: &PhotoId, in_session: u64) -> bool {
        match self {
            Self::None => false,
            Self::Pending { id, session, .. }
            | Self::Settled { id, session }
            | Self::Abandoned { id, session } => id == target && *session == in_session,
        }
    }
}

/// Decides when the grid must scroll to follow the shared selection.
///
/// A selected id that is loaded is scrolled to once per session. An id that
/// is not loaded yet is kept as a pending target until it appears, until the
/// selection changes, until a refresh replaces the list, or until `timeout`
/// elapses, whichever comes first. After a refresh the new list is searched
/// once; an id missing from it is not waited for.
#[derive(Debug)]
pub struct ScrollTracker {
    target: ScrollTarget,
    timeout: Duration,
}

impl ScrollTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            target: ScrollTarget::None,
            timeout,
        }
    }

    /// Index to scroll to for the given inputs, if a scroll is due.
    pub fn observe(
        &mut self,
        selection: Option<&PhotoId>,
        snapshot: &Snapshot,
        now: Instant,
    ) -> Option<usize> {
        let Some(id) = selection else {
            self.target = ScrollTarget::None;
            return None;
        };
        let session = snapshot.session();
        let position = snapshot.position(id);

        if self.target.matches(id, session) {
            let waiting = matches!(self.target, ScrollTarget::Pending { .. });
            let Some(index) = position.filter(|_| waiting) else {
                return None;
            };
            debug!(%id, index, "pending scroll target loaded");
            self.target = ScrollTarget::Settled {
                id: id.clone(),
                session,
            };
            return Some(index);
        }

        let refreshed = match &self.target {
            ScrollTarget::Pending { id: waiting, .. } => {
                if waiting == id {
                    info!(%id, session, "list refreshed; pending scroll dropped");
                    true
                } else {
                    debug!(dropped = %waiting, %id, "selection changed; pending scroll dropped");
                    false
                }
            }
            ScrollTarget::Settled { id: done, .. } | ScrollTarget::Abandoned { id: done, .. } => {
                done == id
            }
            ScrollTarget::None => false,
        };

        self.target = match position {
            Some(_) => ScrollTarget::Settled {
                id: id.clone(),
                session,
            },
            None if refreshed => ScrollTarget::Abandoned {
                id: id.clone(),
                session,
            },
            None => {
                debug!(%id, timeout = ?self.timeout, "selection not loaded; waiting for it");
                ScrollTarget::Pending {
                    id: id.clone(),
                    session,
                    deadline: now + self.timeout,
                }
            }
        };
        position
    }

    /// When the current pending target gives up, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match &self.target {
            ScrollTarget::Pending { deadline, .. } => Some(*deadline),
            _ => None,
        }
    }

    /// Abandons the pending target once its deadline has passed.
    pub fn expire(&mut self, now: Instant) -> bool {
        let ScrollTarget::Pending {
            id,
            session,
            deadline,
        } = &self.target
        else {
            return false;
        };
        if now < *deadline {
            return false;
        }
        info!(%id, "pending scroll target timed out");
        self.target = ScrollTarget::Abandoned {
            id: id.clone(),
            session: *session,
        };
        true
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.target, ScrollTarget::Pending { .. })
    }
}

/// Input side of the grid screen.
#[derive(Debug, Clone)]
pub struct GalleryGrid {
    selection: SelectionStore,
    pager: PagerHandle,
    view: watch::Receiver<GalleryView>,
}

impl GalleryGrid {
    pub fn new(
        selection: SelectionStore,
        pager: PagerHandle,
        view: watch::Receiver<GalleryView>,
    ) -> Self {
        Self {
            selection,
            pager,
            view,
        }
    }

    pub fn view(&self) -> GalleryView {
        self.view.borrow().clone()
    }

    pub fn view_flow(&self) -> watch::Receiver<GalleryView> {
        self.view.clone()
    }

    /// Selects the tapped photo, then asks for the detail screen.
    ///
    /// The selection is written before the navigation is returned, so the
    /// detail screen always opens on the tapped photo.
    pub fn tap(&self, index: usize) -> Result<Navigation> {
        let photo = self.pager.get(index).ok_or_else(|| Error::IndexOutOfRange {
            index,
            len: self.pager.item_count(),
        })?;
        self.selection.write(Some(photo.id.clone()));
        info!(index, id = %photo.id, "photo tapped");
        Ok(Navigation::OpenDetail {
            photo_id: photo.id.clone(),
            index,
        })
    }

    /// Reports the furthest cell on screen so the next page can be prefetched.
    pub fn visible(&self, index: usize) {
        self.pager.notify_access(index);
    }

    pub async fn refresh(&self) -> Result<()> {
        self.pager.refresh().await
    }

    pub async fn retry(&self) -> Result<()> {
        self.pager.retry().await
    }
}
