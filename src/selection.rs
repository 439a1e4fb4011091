//! Shared "currently selected photo" value observed by every screen.

use std::sync::Arc;

use photo_model::PhotoId;
use tokio::sync::watch;
use tracing::debug;

pub type SelectionReceiver = watch::Receiver<Option<PhotoId>>;

/// Single-value observable store holding the selected photo id.
///
/// Writes replace the whole value (last write wins) and wake every
/// subscriber. Subscribers only ever observe the latest value, so a burst
/// of writes may be seen as a single change. Handles are cheap to clone and
/// are passed to the controllers that need them.
#[derive(Debug, Clone)]
pub struct SelectionStore {
    tx: Arc<watch::Sender<Option<PhotoId>>>,
}

impl SelectionStore {
    /// Creates a store with nothing selected.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn read(&self) -> Option<PhotoId> {
        self.tx.borrow().clone()
    }

    /// Replaces the selection. Returns `false`, without notifying anyone,
    /// when `id` equals the current value.
    pub fn write(&self, id: Option<PhotoId>) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == id {
                return false;
            }
            *current = id;
            true
        });
        if changed {
            debug!(selection = ?self.tx.borrow().as_ref().map(PhotoId::as_str), "selection updated");
        }
        changed
    }

    /// Observer whose current value is already marked as seen.
    pub fn subscribe(&self) -> SelectionReceiver {
        self.tx.subscribe()
    }
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self::new()
    }
}
