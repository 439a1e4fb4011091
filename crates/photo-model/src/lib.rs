use std::borrow::Borrow;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub use urls::{PhotoUrls, UrlVariant};

/// Stable identifier of a remote photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhotoId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for PhotoId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for PhotoId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PhotoId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Err(de::Error::invalid_value(
                de::Unexpected::Str(&raw),
                &"a non-empty photo id",
            ));
        }
        Ok(Self(raw))
    }
}

mod urls {
    use super::*;

    /// Named rendition of a photo, smallest last.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum UrlVariant {
        Raw,
        Full,
        #[default]
        Regular,
        Small,
        Thumb,
    }

    impl UrlVariant {
        pub fn as_str(&self) -> &'static str {
            match self {
                Self::Raw => "raw",
                Self::Full => "full",
                Self::Regular => "regular",
                Self::Small => "small",
                Self::Thumb => "thumb",
            }
        }
    }

    impl fmt::Display for UrlVariant {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
    #[serde(default)]
    pub struct PhotoUrls {
        pub raw: Option<String>,
        pub full: Option<String>,
        pub regular: Option<String>,
        pub small: Option<String>,
        pub thumb: Option<String>,
    }

    impl PhotoUrls {
        pub fn get(&self, variant: UrlVariant) -> Option<&str> {
            let url = match variant {
                UrlVariant::Raw => &self.raw,
                UrlVariant::Full => &self.full,
                UrlVariant::Regular => &self.regular,
                UrlVariant::Small => &self.small,
                UrlVariant::Thumb => &self.thumb,
            };
            url.as_deref().filter(|u| !u.is_empty())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PhotoUser {
    pub username: Option<String>,
    pub name: Option<String>,
}

/// One remote photo as delivered by a page source.
///
/// Records are never mutated after construction; consumers share them
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Photo {
    pub id: PhotoId,
    #[serde(default)]
    pub urls: Option<PhotoUrls>,
    #[serde(default)]
    pub user: Option<PhotoUser>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Photo {
    /// Bare record with no URLs, author or description.
    pub fn new(id: impl Into<PhotoId>) -> Self {
        Self {
            id: id.into(),
            urls: None,
            user: None,
            description: None,
        }
    }

    pub fn with_url(mut self, variant: UrlVariant, url: impl Into<String>) -> Self {
        let urls = self.urls.get_or_insert_with(PhotoUrls::default);
        let url = Some(url.into());
        match variant {
            UrlVariant::Raw => urls.raw = url,
            UrlVariant::Full => urls.full = url,
            UrlVariant::Regular => urls.regular = url,
            UrlVariant::Small => urls.small = url,
            UrlVariant::Thumb => urls.thumb = url,
        }
        self
    }

    pub fn with_author(mut self, username: impl Into<String>) -> Self {
        self.user
            .get_or_insert_with(PhotoUser::default)
            .username = Some(username.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn url(&self, variant: UrlVariant) -> Option<&str> {
        self.urls.as_ref().and_then(|urls| urls.get(variant))
    }

    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().and_then(|user| user.username.as_deref())
    }
}
