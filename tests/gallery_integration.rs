use photo_views::config::Configuration;
use photo_views::events::{GridCommand, Navigation};
use photo_views::gallery::{GalleryLoad, GalleryView};
use photo_views::paging::PhotoRepository;
use photo_views::source::MemorySource;
use photo_views::{Error, GalleryScreen, Photo, PhotoBrowser, PhotoId, UrlVariant};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn library(ids: &[&str]) -> Vec<Photo> {
    ids.iter()
        .map(|id| Photo::new(*id).with_url(UrlVariant::Regular, format!("https://img/{id}")))
        .collect()
}

fn config(page_size: usize) -> Configuration {
    let mut cfg = Configuration::default();
    cfg.paging.page_size = page_size;
    cfg.paging.prefetch_distance = 1;
    cfg
}

fn id(raw: &str) -> PhotoId {
    PhotoId::from(raw)
}

async fn next_command(screen: &mut GalleryScreen) -> GridCommand {
    timeout(WAIT, screen.next_command())
        .await
        .expect("timeout waiting for grid command")
        .expect("gallery task stopped")
}

async fn view_where(screen: &GalleryScreen, pred: impl FnMut(&GalleryView) -> bool) -> GalleryView {
    let mut views = screen.grid().view_flow();
    timeout(WAIT, views.wait_for(pred))
        .await
        .expect("timeout waiting for gallery view")
        .expect("gallery task stopped")
        .clone()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loading_shows_progress_then_cells() {
    let source = MemorySource::new(library(&["P1", "P2", "P3"]))
        .with_latency(Duration::from_millis(200));
    let browser = PhotoBrowser::start(source, config(30));
    let mut screen = browser.gallery();

    let loading = view_where(&screen, |v| v.load == GalleryLoad::Loading).await;
    assert!(loading.load.shows_progress());

    let ready = view_where(&screen, |v| v.cells.len() == 3 && v.load == GalleryLoad::Ready).await;
    assert_eq!(ready.cells[2].id, id("P3"));
    assert_eq!(ready.cells[2].url.as_deref(), Some("https://img/P3"));
    assert!(screen.try_next_command().is_none());

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn refresh_failure_notifies_exactly_once() {
    let source = Arc::new(
        MemorySource::new(library(&["P1", "P2"])).with_latency(Duration::from_millis(50)),
    );
    source.fail_next(1);
    let browser = PhotoBrowser::start(source.clone(), config(30));
    let mut screen = browser.gallery();

    let command = next_command(&mut screen).await;
    assert!(matches!(command, GridCommand::ShowError { ref message } if message.contains("injected")));

    let view = view_where(&screen, |v| matches!(v.load, GalleryLoad::Error(_))).await;
    assert!(!view.load.shows_progress());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(screen.try_next_command().is_none(), "error must be reported once");

    screen.grid().retry().await.unwrap();
    view_where(&screen, |v| v.cells.len() == 2 && v.load == GalleryLoad::Ready).await;
    assert!(screen.try_next_command().is_none());

    source.fail_next(1);
    screen.grid().refresh().await.unwrap();
    let again = next_command(&mut screen).await;
    assert!(matches!(again, GridCommand::ShowError { .. }));
    assert_eq!(screen.grid().view().cells.len(), 2, "failed refresh keeps the grid");

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tap_selects_before_navigating() {
    let browser = PhotoBrowser::start(MemorySource::new(library(&["P1", "P2", "P3"])), config(30));
    let mut screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 3).await;

    let navigation = screen.grid().tap(1).unwrap();
    assert_eq!(
        navigation,
        Navigation::OpenDetail {
            photo_id: id("P2"),
            index: 1
        }
    );
    assert_eq!(browser.selection().read(), Some(id("P2")));

    let detail = browser.detail();
    assert_eq!(detail.pager().current().initial_index, 1);

    // The grid follows its own tap as well.
    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 1 });

    detail.close().await.unwrap();
    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tap_outside_loaded_cells_is_rejected() {
    let browser = PhotoBrowser::start(MemorySource::new(library(&["P1"])), config(30));
    let screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 1).await;

    let err = screen.grid().tap(5).unwrap_err();
    assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 1 }));
    assert_eq!(browser.selection().read(), None);

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn swiping_in_detail_scrolls_the_grid() {
    let browser = PhotoBrowser::start(
        MemorySource::new(library(&["P1", "P2", "P3", "P4"])),
        config(30),
    );
    let mut screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 4).await;

    screen.grid().tap(0).unwrap();
    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 0 });

    let detail = browser.detail();
    detail.pager().settle(3);
    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 3 });

    detail.pager().settle(3);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(screen.try_next_command().is_none());

    detail.close().await.unwrap();
    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn selection_beyond_loaded_pages_scrolls_once_loaded() {
    let browser = PhotoBrowser::start(
        MemorySource::new(library(&["P1", "P2", "P3", "P4"])),
        config(2),
    );
    let mut screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 2).await;

    browser.selection().write(Some(id("P4")));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(screen.try_next_command().is_none());

    screen.grid().visible(1);
    view_where(&screen, |v| v.cells.len() == 4).await;
    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 3 });

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_scroll_gives_up_after_timeout() {
    let mut cfg = config(2);
    cfg.gallery.pending_scroll_timeout = Duration::from_millis(100);
    let browser = PhotoBrowser::start(MemorySource::new(library(&["P1", "P2", "P3", "P4"])), cfg);
    let mut screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 2).await;

    browser.selection().write(Some(id("P4")));
    tokio::time::sleep(Duration::from_millis(300)).await;

    browser.pager().load_more().await.unwrap();
    let mut flow = browser.pager().photo_flow();
    timeout(WAIT, flow.wait_for(|s| s.len() == 4)).await.unwrap().unwrap();
    view_where(&screen, |v| v.cells.len() == 4).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(screen.try_next_command().is_none());

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closed_screen_emits_nothing() {
    let browser = PhotoBrowser::start(MemorySource::new(library(&["P1", "P2"])), config(30));
    let screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 2).await;
    let mut views = screen.grid().view_flow();
    views.borrow_and_update();

    screen.close().await.unwrap();
    assert!(views.changed().await.is_err());

    browser.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_command_consumer_does_not_hold_back_the_view() {
    let source = Arc::new(MemorySource::new(library(&["P1", "P2", "P3"])));
    let mut cfg = config(30);
    cfg.gallery.command_buffer = 1;
    let browser = PhotoBrowser::start(source.clone(), cfg);
    let mut screen = browser.gallery();
    view_where(&screen, |v| v.cells.len() == 3 && v.load == GalleryLoad::Ready).await;

    // Nobody drains the commands: the first scroll fills the channel and the
    // later ones have to wait.
    browser.selection().write(Some(id("P1")));
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.selection().write(Some(id("P2")));
    tokio::time::sleep(Duration::from_millis(100)).await;
    browser.selection().write(Some(id("P3")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    source.fail_next(1);
    screen.grid().refresh().await.unwrap();
    let view = view_where(&screen, |v| matches!(v.load, GalleryLoad::Error(_))).await;
    assert_eq!(view.cells.len(), 3);

    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 0 });
    assert!(matches!(
        next_command(&mut screen).await,
        GridCommand::ShowError { ref message } if message.contains("injected")
    ));
    // The scroll to P2 was superseded by the one to P3.
    assert_eq!(next_command(&mut screen).await, GridCommand::ScrollTo { index: 2 });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(screen.try_next_command().is_none());

    screen.close().await.unwrap();
    browser.shutdown().await.unwrap();
}
