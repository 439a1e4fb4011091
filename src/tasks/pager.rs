use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use photo_model::{Photo, PhotoId};
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::PagingOptions;
use crate::events::PagerCommand;
use crate::paging::{LoadState, LoadStates, Snapshot};
use crate::source::{FetchError, PageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Refresh,
    Append,
}

struct Fetched {
    seq: u64,
    kind: FetchKind,
    page: u32,
    result: Result<Vec<Photo>, FetchError>,
}

struct Pager<S> {
    source: Arc<S>,
    opts: PagingOptions,
    snapshot_tx: watch::Sender<Snapshot>,
    load_tx: watch::Sender<LoadStates>,
    tasks: JoinSet<Fetched>,
    /// Sequence number of the fetch whose result is still wanted.
    in_flight: Option<u64>,
    seq: u64,
    session: u64,
    next_page: u32,
    seen: HashSet<PhotoId>,
}

impl<S: PageSource> Pager<S> {
    fn set_load(&self, update: impl FnOnce(&mut LoadStates)) {
        self.load_tx.send_if_modified(|states| {
            let before = states.clone();
            update(states);
            *states != before
        });
    }

    fn load_states(&self) -> LoadStates {
        self.load_tx.borrow().clone()
    }

    fn spawn_fetch(&mut self, kind: FetchKind, page: u32) {
        self.seq += 1;
        let seq = self.seq;
        let source = Arc::clone(&self.source);
        let per_page = self.opts.page_size;
        self.tasks.spawn(async move {
            let result = source.fetch_page(page, per_page).await;
            Fetched {
                seq,
                kind,
                page,
                result,
            }
        });
        self.in_flight = Some(seq);
        debug!(?kind, page, seq, "fetch started");
    }

    fn start_refresh(&mut self) {
        // A refresh supersedes whatever was loading before.
        self.tasks.abort_all();
        self.set_load(|s| {
            s.refresh = LoadState::Loading;
            s.append = LoadState::Idle;
        });
        self.spawn_fetch(FetchKind::Refresh, 1);
    }

    fn start_append(&mut self) {
        if self.in_flight.is_some() {
            debug!("append skipped: fetch in flight");
            return;
        }
        let states = self.load_states();
        if states.refresh != LoadState::Idle || states.append != LoadState::Idle {
            debug!(?states, "append skipped");
            return;
        }
        if self.session == 0 {
            debug!("append skipped: nothing loaded yet");
            return;
        }
        self.set_load(|s| s.append = LoadState::Loading);
        self.spawn_fetch(FetchKind::Append, self.next_page);
    }

    fn retry(&mut self) {
        let states = self.load_states();
        if states.refresh.is_error() {
            info!("retrying refresh");
            self.start_refresh();
        } else if states.append.is_error() {
            info!(page = self.next_page, "retrying append");
            self.set_load(|s| s.append = LoadState::Idle);
            self.start_append();
        } else {
            debug!("retry ignored: nothing failed");
        }
    }

    fn handle(&mut self, command: PagerCommand) {
        match command {
            PagerCommand::Refresh => self.start_refresh(),
            PagerCommand::LoadMore => self.start_append(),
            PagerCommand::Retry => self.retry(),
        }
    }

    fn end_state(&self, received: usize) -> LoadState {
        if received < self.opts.page_size {
            LoadState::EndOfData
        } else {
            LoadState::Idle
        }
    }

    fn complete(&mut self, fetched: Fetched) {
        if self.in_flight != Some(fetched.seq) {
            debug!(seq = fetched.seq, page = fetched.page, "stale fetch result dropped");
            return;
        }
        self.in_flight = None;

        match (fetched.kind, fetched.result) {
            (FetchKind::Refresh, Ok(photos)) => {
                let received = photos.len();
                self.session += 1;
                self.seen.clear();
                let items = self.dedup(photos);
                info!(
                    session = self.session,
                    received,
                    kept = items.len(),
                    "refresh complete"
                );
                self.snapshot_tx
                    .send_replace(Snapshot::new(self.session, items));
                self.next_page = 2;
                let append = self.end_state(received);
                self.set_load(|s| {
                    s.refresh = LoadState::Idle;
                    s.append = append;
                });
            }
            (FetchKind::Append, Ok(photos)) => {
                let received = photos.len();
                let fresh = self.dedup(photos);
                if fresh.len() < received {
                    debug!(
                        page = fetched.page,
                        duplicates = received - fresh.len(),
                        "dropped already loaded photos"
                    );
                }
                if !fresh.is_empty() {
                    self.snapshot_tx.send_modify(|snap| *snap = snap.appended(fresh));
                }
                info!(
                    page = fetched.page,
                    received,
                    total = self.snapshot_tx.borrow().len(),
                    "page appended"
                );
                self.next_page += 1;
                let append = self.end_state(received);
                self.set_load(|s| s.append = append);
            }
            (FetchKind::Refresh, Err(err)) => {
                warn!(error = %err, "refresh failed");
                self.set_load(|s| s.refresh = LoadState::Error(err.to_string()));
            }
            (FetchKind::Append, Err(err)) => {
                warn!(error = %err, page = fetched.page, "append failed");
                self.set_load(|s| s.append = LoadState::Error(err.to_string()));
            }
        }
    }

    fn dedup(&mut self, photos: Vec<Photo>) -> Vec<Arc<Photo>> {
        photos
            .into_iter()
            .filter(|photo| self.seen.insert(photo.id.clone()))
            .map(Arc::new)
            .collect()
    }
}

/// Owns the paged photo list.
///
/// Rules:
/// - The first page is requested as soon as the task starts.
/// - At most one fetch is wanted at a time; a refresh aborts an in-flight append.
/// - Appends never reorder or replace loaded items; ids already loaded are skipped.
/// - A page shorter than `page-size` ends the list until the next refresh.
#[instrument(skip_all, fields(page_size = opts.page_size))]
pub async fn run<S: PageSource>(
    source: Arc<S>,
    mut commands: Receiver<PagerCommand>,
    snapshot_tx: watch::Sender<Snapshot>,
    load_tx: watch::Sender<LoadStates>,
    opts: PagingOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut pager = Pager {
        source,
        opts,
        snapshot_tx,
        load_tx,
        tasks: JoinSet::new(),
        in_flight: None,
        seq: 0,
        session: 0,
        next_page: 1,
        seen: HashSet::new(),
    };
    pager.start_refresh();

    loop {
        select! {
            biased;

            _ = cancel.cancelled() => {
                info!("cancel received; exiting pager task");
                break;
            }

            Some(joined) = pager.tasks.join_next() => match joined {
                Ok(fetched) => pager.complete(fetched),
                Err(err) if err.is_cancelled() => debug!("aborted fetch reaped"),
                Err(err) => {
                    warn!("fetch task failed: {err}");
                    pager.in_flight = None;
                    pager.set_load(|s| {
                        if s.refresh.is_loading() {
                            s.refresh = LoadState::Error(err.to_string());
                        } else if s.append.is_loading() {
                            s.append = LoadState::Error(err.to_string());
                        }
                    });
                }
            },

            maybe_cmd = commands.recv() => match maybe_cmd {
                Some(command) => {
                    debug!(?command, "pager command");
                    pager.handle(command);
                }
                None => {
                    info!("all pager handles dropped; exiting pager task");
                    break;
                }
            },
        }
    }

    pager.tasks.abort_all();
    Ok(())
}
