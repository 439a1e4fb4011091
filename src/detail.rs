//! Detail view state derived from the photo list and the shared selection.

use photo_model::{Photo, PhotoId, UrlVariant};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::paging::{PagerHandle, Snapshot};
use crate::selection::SelectionStore;

/// Projection of a [`Photo`] for the detail screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDetail {
    pub id: PhotoId,
    pub url: Option<String>,
    pub author_name: Option<String>,
    pub description: Option<String>,
}

impl PhotoDetail {
    pub fn from_photo(photo: &Photo, variant: UrlVariant) -> Self {
        Self {
            id: photo.id.clone(),
            url: photo.url(variant).map(str::to_owned),
            author_name: photo.author().map(str::to_owned),
            description: photo.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetailState {
    pub current: Option<PhotoDetail>,
    pub list_size: usize,
    pub initial_index: usize,
}

/// Position of the selected photo, falling back to the first item when
/// nothing is selected or the selection is not loaded.
pub fn resolve_index(snapshot: &Snapshot, selection: Option<&PhotoId>) -> usize {
    selection
        .and_then(|id| snapshot.position(id))
        .unwrap_or(0)
}

/// Combines one snapshot with one selection value.
///
/// Only the current item is projected; every other detail is available on
/// demand through [`DetailPager::detail_at`].
pub fn resolve(snapshot: &Snapshot, selection: Option<&PhotoId>, variant: UrlVariant) -> DetailState {
    let initial_index = resolve_index(snapshot, selection);
    DetailState {
        current: snapshot
            .get(initial_index)
            .map(|photo| PhotoDetail::from_photo(photo, variant)),
        list_size: snapshot.len(),
        initial_index,
    }
}

/// Controller behind the swipeable single-photo screen.
#[derive(Debug, Clone)]
pub struct DetailPager {
    selection: SelectionStore,
    pager: PagerHandle,
    state: watch::Receiver<DetailState>,
    variant: UrlVariant,
}

impl DetailPager {
    pub fn new(
        selection: SelectionStore,
        pager: PagerHandle,
        state: watch::Receiver<DetailState>,
        variant: UrlVariant,
    ) -> Self {
        Self {
            selection,
            pager,
            state,
            variant,
        }
    }

    pub fn state(&self) -> watch::Receiver<DetailState> {
        self.state.clone()
    }

    pub fn current(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Detail for a neighbouring page of the pager.
    pub fn detail_at(&self, index: usize) -> Option<PhotoDetail> {
        self.pager
            .get(index)
            .map(|photo| PhotoDetail::from_photo(&photo, self.variant))
    }

    /// The user settled on page `index`; its id becomes the shared selection.
    ///
    /// A page that is not loaded clears the selection. Returns whether the
    /// selection changed.
    pub fn settle(&self, index: usize) -> bool {
        let selected = match self.pager.get(index) {
            Some(photo) => {
                debug!(index, id = %photo.id, "pager settled");
                Some(photo.id.clone())
            }
            None => {
                warn!(
                    index,
                    loaded = self.pager.item_count(),
                    "settled on a page that is not loaded; clearing selection"
                );
                None
            }
        };
        self.selection.write(selected)
    }
}
