//! Wires the selection store, the paging task and the two screens together.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::config::Configuration;
use crate::detail::{DetailPager, resolve};
use crate::events::GridCommand;
use crate::gallery::{GalleryGrid, GalleryView};
use crate::paging::{LoadStates, PagerHandle, PhotoRepository, Snapshot};
use crate::selection::SelectionStore;
use crate::source::PageSource;
use crate::tasks;

const PAGER_COMMAND_BUFFER: usize = 16;

async fn join(task: JoinHandle<Result<()>>, name: &'static str) -> Result<()> {
    task.await
        .with_context(|| format!("{name} task panicked"))?
        .with_context(|| format!("{name} task failed"))
}

/// One browsing session: shared selection plus the paged photo list.
///
/// Must be started from inside a tokio runtime. Screens opened from the
/// session run their own task, cancelled when the screen is dropped or
/// closed.
pub struct PhotoBrowser {
    config: Configuration,
    selection: SelectionStore,
    pager: PagerHandle,
    cancel: CancellationToken,
    pager_task: JoinHandle<Result<()>>,
}

impl PhotoBrowser {
    /// Spawns the paging task; the first page is requested right away.
    pub fn start<S: PageSource>(source: S, config: Configuration) -> Self {
        let cancel = CancellationToken::new();
        let (commands_tx, commands_rx) = mpsc::channel(PAGER_COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (load_tx, load_rx) = watch::channel(LoadStates::default());

        let pager_task = tokio::spawn(tasks::pager::run(
            Arc::new(source),
            commands_rx,
            snapshot_tx,
            load_tx,
            config.paging.clone(),
            cancel.child_token(),
        ));
        let pager = PagerHandle::new(
            commands_tx,
            snapshot_rx,
            load_rx,
            config.paging.prefetch_distance,
        );
        info!(page_size = config.paging.page_size, "photo browser started");

        Self {
            config,
            selection: SelectionStore::new(),
            pager,
            cancel,
            pager_task,
        }
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn pager(&self) -> &PagerHandle {
        &self.pager
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Opens the grid screen.
    pub fn gallery(&self) -> GalleryScreen {
        let opts = self.config.gallery.clone();
        let snapshots = self.pager.photo_flow();
        let loads = self.pager.load_state_flow();
        let initial = GalleryView::build(
            &snapshots.borrow(),
            &loads.borrow().refresh,
            opts.thumbnail_variant,
        );
        let (view_tx, view_rx) = watch::channel(initial);
        let (commands_tx, commands_rx) = mpsc::channel(opts.command_buffer);
        let token = self.cancel.child_token();

        let task = tokio::spawn(tasks::gallery::run(
            snapshots,
            loads,
            self.selection.subscribe(),
            view_tx,
            commands_tx,
            opts,
            token.clone(),
        ));
        debug!("gallery screen opened");

        GalleryScreen {
            grid: GalleryGrid::new(self.selection.clone(), self.pager.clone(), view_rx),
            commands: commands_rx,
            task,
            guard: token.drop_guard(),
        }
    }

    /// Opens the detail screen on the current selection.
    ///
    /// The first state is computed before this returns, from the selection
    /// as it stands now.
    pub fn detail(&self) -> DetailScreen {
        let variant = self.config.detail.display_variant;
        let snapshots = self.pager.photo_flow();
        let initial = resolve(&snapshots.borrow(), self.selection.read().as_ref(), variant);
        debug!(
            index = initial.initial_index,
            size = initial.list_size,
            "detail screen opened"
        );
        let (state_tx, state_rx) = watch::channel(initial);
        let token = self.cancel.child_token();

        let task = tokio::spawn(tasks::detail::run(
            snapshots,
            self.selection.subscribe(),
            state_tx,
            variant,
            token.clone(),
        ));

        DetailScreen {
            pager: DetailPager::new(self.selection.clone(), self.pager.clone(), state_rx, variant),
            task,
            guard: token.drop_guard(),
        }
    }

    /// Cancels every task of the session and waits for the pager to stop.
    pub async fn shutdown(self) -> Result<()> {
        info!("photo browser shutting down");
        self.cancel.cancel();
        join(self.pager_task, "pager").await
    }
}

/// Grid screen: controller plus the commands its task emits.
pub struct GalleryScreen {
    grid: GalleryGrid,
    commands: mpsc::Receiver<GridCommand>,
    task: JoinHandle<Result<()>>,
    guard: DropGuard,
}

impl GalleryScreen {
    pub fn grid(&self) -> &GalleryGrid {
        &self.grid
    }

    pub async fn next_command(&mut self) -> Option<GridCommand> {
        self.commands.recv().await
    }

    pub fn try_next_command(&mut self) -> Option<GridCommand> {
        self.commands.try_recv().ok()
    }

    /// Stops the screen's task and waits for it.
    pub async fn close(self) -> Result<()> {
        drop(self.guard);
        join(self.task, "gallery").await
    }
}

/// Detail pager screen.
pub struct DetailScreen {
    pager: DetailPager,
    task: JoinHandle<Result<()>>,
    guard: DropGuard,
}

impl DetailScreen {
    pub fn pager(&self) -> &DetailPager {
        &self.pager
    }

    pub async fn close(self) -> Result<()> {
        drop(self.guard);
        join(self.task, "detail").await
    }
}
