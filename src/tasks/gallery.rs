use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::GalleryOptions;
use crate::events::GridCommand;
use crate::gallery::{ErrorNotices, GalleryView, ScrollTracker};
use crate::paging::{LoadStates, Snapshot};
use crate::selection::SelectionReceiver;

/// Grid commands waiting for room in the command channel.
///
/// Holds at most one notice and one scroll. A newer scroll replaces an
/// undelivered one, since only the latest selection matters to the grid.
#[derive(Debug, Default)]
struct Outbox {
    error: Option<String>,
    scroll: Option<usize>,
}

impl Outbox {
    fn is_empty(&self) -> bool {
        self.error.is_none() && self.scroll.is_none()
    }

    fn push(&mut self, command: GridCommand) {
        match command {
            GridCommand::ShowError { message } => {
                if let Some(previous) = self.error.replace(message) {
                    debug!(%previous, "undelivered error notice replaced");
                }
            }
            GridCommand::ScrollTo { index } => {
                if let Some(previous) = self.scroll.replace(index) {
                    debug!(previous, index, "undelivered scroll superseded");
                }
            }
        }
    }

    /// Next command to deliver; notices go before scrolls.
    fn pop(&mut self) -> Option<GridCommand> {
        if let Some(message) = self.error.take() {
            return Some(GridCommand::ShowError { message });
        }
        self.scroll.take().map(|index| GridCommand::ScrollTo { index })
    }
}

/// Drives the grid screen from the photo list, its load state and the selection.
///
/// Rules:
/// - `view` always reflects the latest list and refresh state.
/// - Each refresh failure produces exactly one `ShowError`.
/// - A selection made elsewhere produces `ScrollTo` once the photo is loaded
///   (see [`ScrollTracker`] for how long it waits).
/// - A slow command consumer never holds back the view; commands it has not
///   taken yet wait in an [`Outbox`].
#[instrument(skip_all, name = "gallery")]
pub async fn run(
    mut snapshots: watch::Receiver<Snapshot>,
    mut loads: watch::Receiver<LoadStates>,
    mut selection: SelectionReceiver,
    view: watch::Sender<GalleryView>,
    commands: Sender<GridCommand>,
    opts: GalleryOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut notices = ErrorNotices::default();
    let mut scroll = ScrollTracker::new(opts.pending_scroll_timeout);
    let mut outbox = Outbox::default();

    'screen: loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let load = loads.borrow_and_update().clone();
        let selected = selection.borrow_and_update().clone();
        if cancel.is_cancelled() {
            break;
        }

        let next = GalleryView::build(&snapshot, &load.refresh, opts.thumbnail_variant);
        view.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });

        if let Some(message) = notices.observe(&load.refresh) {
            info!(%message, "refresh failed; notifying");
            outbox.push(GridCommand::ShowError { message });
        }

        if let Some(index) = scroll.observe(selected.as_ref(), &snapshot, Instant::now()) {
            debug!(index, "scrolling to selection");
            outbox.push(GridCommand::ScrollTo { index });
        }

        loop {
            let deadline = scroll.deadline();
            select! {
                biased;

                _ = cancel.cancelled() => break 'screen,

                changed = snapshots.changed() => {
                    if changed.is_err() {
                        info!("photo list closed; exiting gallery task");
                        break 'screen;
                    }
                    break;
                }

                changed = loads.changed() => {
                    if changed.is_err() {
                        info!("load state closed; exiting gallery task");
                        break 'screen;
                    }
                    break;
                }

                changed = selection.changed() => {
                    if changed.is_err() {
                        info!("selection store dropped; exiting gallery task");
                        break 'screen;
                    }
                    break;
                }

                permit = commands.reserve(), if !outbox.is_empty() => match permit {
                    Ok(permit) => {
                        if let Some(command) = outbox.pop() {
                            debug!(?command, "grid command delivered");
                            permit.send(command);
                        }
                    }
                    Err(_) => {
                        warn!("grid command receiver dropped; exiting gallery task");
                        break 'screen;
                    }
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    // Nothing to recompute; just stop waiting for the target.
                    scroll.expire(Instant::now());
                }
            }
        }
    }
    debug!("gallery task stopped");
    Ok(())
}
