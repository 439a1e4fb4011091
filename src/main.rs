//! Headless replay driver for the photo browser.
//!
//! Loads a photo listing and a script of user actions, then plays the
//! actions against a live session and logs what each screen would show.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use photo_views::config::Configuration;
use photo_views::events::Navigation;
use photo_views::source::JsonFileSource;
use photo_views::{DetailScreen, GalleryScreen, PhotoBrowser};
use serde::Deserialize;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "photo-views", about = "Replay user actions against the photo browser")]
struct Cli {
    /// Path to YAML config file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON photo listing served as the remote source
    #[arg(short, long, value_name = "FILE")]
    photos: PathBuf,

    /// YAML list of actions to replay
    #[arg(short, long, value_name = "FILE")]
    script: PathBuf,

    /// Time given to background tasks after each action
    #[arg(long, value_name = "DURATION", default_value = "50ms", value_parser = humantime::parse_duration)]
    settle: Duration,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
enum Step {
    Wait {
        #[serde(with = "humantime_serde")]
        duration: Duration,
    },
    Tap {
        index: usize,
    },
    Swipe {
        index: usize,
    },
    Visible {
        index: usize,
    },
    Back,
    Refresh,
    Retry,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("photo_views={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn load_script(path: &Path) -> Result<Vec<Step>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing script {}", path.display()))
}

fn report(gallery: &mut GalleryScreen, detail: Option<&DetailScreen>) {
    while let Some(command) = gallery.try_next_command() {
        info!(?command, "grid command");
    }
    let view = gallery.grid().view();
    info!(cells = view.cells.len(), load = ?view.load, "grid");
    if let Some(screen) = detail {
        let state = screen.pager().current();
        info!(
            index = state.initial_index,
            size = state.list_size,
            current = ?state.current.as_ref().map(|d| d.id.as_str()),
            author = ?state.current.as_ref().and_then(|d| d.author_name.as_deref()),
            "detail"
        );
    }
}

async fn replay(
    browser: &PhotoBrowser,
    gallery: &mut GalleryScreen,
    detail: &mut Option<DetailScreen>,
    script: Vec<Step>,
    settle: Duration,
) -> Result<()> {
    tokio::time::sleep(settle).await;
    report(gallery, detail.as_ref());

    for step in script {
        info!(?step, "step");
        match step {
            Step::Wait { duration } => tokio::time::sleep(duration).await,
            Step::Tap { index } => match gallery.grid().tap(index) {
                Ok(Navigation::OpenDetail { photo_id, index }) => {
                    info!(%photo_id, index, "opening detail");
                    if let Some(previous) = detail.replace(browser.detail()) {
                        previous.close().await?;
                    }
                }
                Err(err) => warn!("tap ignored: {err}"),
            },
            Step::Swipe { index } => match detail.as_ref() {
                Some(screen) => {
                    screen.pager().settle(index);
                }
                None => warn!("swipe ignored: detail screen is not open"),
            },
            Step::Visible { index } => gallery.grid().visible(index),
            Step::Back => {
                if let Some(screen) = detail.take() {
                    screen.close().await?;
                }
            }
            Step::Refresh => gallery.grid().refresh().await?,
            Step::Retry => gallery.grid().retry().await?,
        }
        tokio::time::sleep(settle).await;
        report(gallery, detail.as_ref());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("validating configuration")?;
    let script = load_script(&cli.script)?;
    info!(steps = script.len(), photos = %cli.photos.display(), "replaying");

    let browser = PhotoBrowser::start(JsonFileSource::new(&cli.photos), config);
    let mut gallery = browser.gallery();
    let mut detail: Option<DetailScreen> = None;

    tokio::select! {
        res = replay(&browser, &mut gallery, &mut detail, script, cli.settle) => res?,
        _ = tokio::signal::ctrl_c() => info!("interrupted; stopping replay"),
    }

    if let Some(screen) = detail.take() {
        screen.close().await?;
    }
    gallery.close().await?;
    browser.shutdown().await
}
