pub mod config;
pub mod detail;
pub mod error;
pub mod events;
pub mod gallery;
pub mod paging;
pub mod selection;
pub mod session;
pub mod source;
pub mod tasks {
    pub mod detail;
    pub mod gallery;
    pub mod pager;
}

pub use error::{Error, Result};
pub use photo_model::{Photo, PhotoId, PhotoUrls, PhotoUser, UrlVariant};
pub use session::{DetailScreen, GalleryScreen, PhotoBrowser};
