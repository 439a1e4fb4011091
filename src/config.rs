use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use photo_model::UrlVariant;
use serde::Deserialize;

/// Paging behaviour of the photo list provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PagingOptions {
    /// Number of photos requested per page.
    pub page_size: usize,
    /// Start fetching the next page once a visible cell is this close to the end.
    pub prefetch_distance: usize,
}

impl PagingOptions {
    const fn default_page_size() -> usize {
        30
    }

    const fn default_prefetch_distance() -> usize {
        5
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "paging.page-size must be greater than zero");
        ensure!(
            self.prefetch_distance < self.page_size,
            "paging.prefetch-distance must be smaller than paging.page-size"
        );
        Ok(())
    }
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            prefetch_distance: Self::default_prefetch_distance(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GalleryOptions {
    /// How long a selection that is not loaded yet stays queued as a scroll target.
    #[serde(with = "humantime_serde")]
    pub pending_scroll_timeout: Duration,
    /// Capacity of the scroll/notice command channel.
    pub command_buffer: usize,
    pub thumbnail_variant: UrlVariant,
}

impl GalleryOptions {
    const fn default_pending_scroll_timeout() -> Duration {
        Duration::from_secs(10)
    }

    const fn default_command_buffer() -> usize {
        32
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.pending_scroll_timeout > Duration::ZERO,
            "gallery.pending-scroll-timeout must be positive"
        );
        ensure!(
            self.command_buffer > 0,
            "gallery.command-buffer must be greater than zero"
        );
        Ok(())
    }
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            pending_scroll_timeout: Self::default_pending_scroll_timeout(),
            command_buffer: Self::default_command_buffer(),
            thumbnail_variant: UrlVariant::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DetailOptions {
    pub display_variant: UrlVariant,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub paging: PagingOptions,
    pub gallery: GalleryOptions,
    pub detail: DetailOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        self.paging.validate()?;
        self.gallery.validate()?;
        Ok(self)
    }
}
