use anyhow::Result;
use photo_model::UrlVariant;
use tokio::select;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::detail::{DetailState, resolve};
use crate::paging::Snapshot;
use crate::selection::SelectionReceiver;

/// Keeps `output` in step with the latest (snapshot, selection) pair.
///
/// Both inputs are watch channels, so a burst of changes collapses into one
/// recomputation over the newest values. Unchanged results are not
/// republished. Nothing is published once `cancel` fires.
#[instrument(skip_all, name = "detail")]
pub async fn run(
    mut snapshots: watch::Receiver<Snapshot>,
    mut selection: SelectionReceiver,
    output: watch::Sender<DetailState>,
    variant: UrlVariant,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let selected = selection.borrow_and_update().clone();
        if cancel.is_cancelled() {
            break;
        }

        let next = resolve(&snapshot, selected.as_ref(), variant);
        let published = output.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if published {
            let state = output.borrow();
            debug!(
                index = state.initial_index,
                size = state.list_size,
                current = ?state.current.as_ref().map(|d| d.id.as_str()),
                "detail state updated"
            );
        }

        select! {
            biased;

            _ = cancel.cancelled() => break,

            changed = snapshots.changed() => {
                if changed.is_err() {
                    info!("photo list closed; exiting detail task");
                    break;
                }
            }

            changed = selection.changed() => {
                if changed.is_err() {
                    info!("selection store dropped; exiting detail task");
                    break;
                }
            }
        }
    }
    debug!("detail task stopped");
    Ok(())
}
