//! Materialized photo list plus the handle screens use to drive paging.

use std::sync::Arc;

use photo_model::{Photo, PhotoId};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::PagerCommand;

/// Progress of one paging operation (initial/refresh load or append).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Error(String),
    EndOfData,
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub append: LoadState,
}

/// Materialized prefix of the remote photo list.
///
/// Within one session the list only grows at the end, so an index never
/// changes identity. A successful refresh starts a new session.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    session: u64,
    items: Arc<Vec<Arc<Photo>>>,
}

impl Snapshot {
    pub fn new(session: u64, items: Vec<Arc<Photo>>) -> Self {
        Self {
            session,
            items: Arc::new(items),
        }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Photo>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Photo>> {
        self.items.iter()
    }

    /// Index of the first record with `id`.
    pub fn position(&self, id: &PhotoId) -> Option<usize> {
        self.items.iter().position(|photo| &photo.id == id)
    }

    /// Same session with `page` added at the end.
    pub(crate) fn appended(&self, page: Vec<Arc<Photo>>) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + page.len());
        items.extend(self.items.iter().cloned());
        items.extend(page);
        Self::new(self.session, items)
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.session == other.session
            && (Arc::ptr_eq(&self.items, &other.items) || self.items == other.items)
    }
}

/// Source of the continuously growing photo list.
pub trait PhotoRepository {
    fn photo_flow(&self) -> watch::Receiver<Snapshot>;
}

/// Cloneable handle onto the paging task.
#[derive(Debug, Clone)]
pub struct PagerHandle {
    commands: mpsc::Sender<PagerCommand>,
    snapshot: watch::Receiver<Snapshot>,
    load: watch::Receiver<LoadStates>,
    prefetch_distance: usize,
}

impl PagerHandle {
    pub fn new(
        commands: mpsc::Sender<PagerCommand>,
        snapshot: watch::Receiver<Snapshot>,
        load: watch::Receiver<LoadStates>,
        prefetch_distance: usize,
    ) -> Self {
        Self {
            commands,
            snapshot,
            load,
            prefetch_distance,
        }
    }

    pub fn item_count(&self) -> usize {
        self.snapshot.borrow().len()
    }

    /// Record at `index`, or `None` while it is not materialized.
    pub fn get(&self, index: usize) -> Option<Arc<Photo>> {
        self.snapshot.borrow().get(index).cloned()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn load_states(&self) -> LoadStates {
        self.load.borrow().clone()
    }

    pub fn load_state_flow(&self) -> watch::Receiver<LoadStates> {
        self.load.clone()
    }

    pub async fn refresh(&self) -> Result<()> {
        self.send(PagerCommand::Refresh).await
    }

    pub async fn load_more(&self) -> Result<()> {
        self.send(PagerCommand::LoadMore).await
    }

    pub async fn retry(&self) -> Result<()> {
        self.send(PagerCommand::Retry).await
    }

    /// Prefetch hint from a view that has `index` on screen.
    ///
    /// Requests the next page once `index` is within the prefetch distance
    /// of the end. Hints are dropped when the command queue is full.
    pub fn notify_access(&self, index: usize) {
        let len = self.item_count();
        if index.saturating_add(self.prefetch_distance) < len {
            return;
        }
        if self.load.borrow().append != LoadState::Idle {
            return;
        }
        if let Err(err) = self.commands.try_send(PagerCommand::LoadMore) {
            debug!(index, len, "prefetch hint dropped: {err}");
        }
    }

    async fn send(&self, command: PagerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::SessionClosed("pager"))
    }
}

impl PhotoRepository for PagerHandle {
    fn photo_flow(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos(ids: &[&str]) -> Vec<Arc<Photo>> {
        ids.iter().map(|id| Arc::new(Photo::new(*id))).collect()
    }

    #[test]
    fn position_finds_first_match() {
        let snap = Snapshot::new(1, photos(&["a", "b", "c"]));
        assert_eq!(snap.position(&PhotoId::from("b")), Some(1));
        assert_eq!(snap.position(&PhotoId::from("zz")), None);
    }

    #[test]
    fn append_keeps_existing_indices() {
        let snap = Snapshot::new(3, photos(&["a", "b"]));
        let grown = snap.appended(photos(&["c"]));
        assert_eq!(grown.session(), 3);
        assert_eq!(grown.len(), 3);
        for (i, photo) in snap.iter().enumerate() {
            assert!(Arc::ptr_eq(photo, grown.get(i).unwrap()));
        }
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn snapshots_differ_across_sessions() {
        let a = Snapshot::new(1, photos(&["a"]));
        let b = Snapshot::new(2, photos(&["a"]));
        assert_ne!(a, b);
        assert_eq!(a, Snapshot::new(1, photos(&["a"])));
    }

    #[tokio::test]
    async fn prefetch_hint_only_near_the_end() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_snap_tx, snap_rx) = watch::channel(Snapshot::new(1, photos(&["a", "b", "c", "d"])));
        let (_load_tx, load_rx) = watch::channel(LoadStates::default());
        let pager = PagerHandle::new(tx, snap_rx, load_rx, 1);

        pager.notify_access(1);
        assert!(rx.try_recv().is_err());

        pager.notify_access(3);
        assert_eq!(rx.try_recv().unwrap(), PagerCommand::LoadMore);
    }

    #[tokio::test]
    async fn prefetch_hint_accepts_any_index() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_snap_tx, snap_rx) = watch::channel(Snapshot::new(1, photos(&["a", "b"])));
        let (_load_tx, load_rx) = watch::channel(LoadStates::default());
        let pager = PagerHandle::new(tx, snap_rx, load_rx, 5);

        pager.notify_access(usize::MAX);
        assert_eq!(rx.try_recv().unwrap(), PagerCommand::LoadMore);
    }

    #[tokio::test]
    async fn prefetch_hint_skipped_unless_append_idle() {
        let (tx, mut rx) = mpsc::channel(4);
        let (_snap_tx, snap_rx) = watch::channel(Snapshot::new(1, photos(&["a"])));
        let (_load_tx, load_rx) = watch::channel(LoadStates {
            refresh: LoadState::Idle,
            append: LoadState::EndOfData,
        });
        let pager = PagerHandle::new(tx, snap_rx, load_rx, 5);

        pager.notify_access(0);
        assert!(rx.try_recv().is_err());
    }
}
