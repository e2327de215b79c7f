//! Opportunistic local caching of remote card icons.
//!
//! # Responsibility
//! - Mirror a remote icon image into the storage root on save.
//! - Rewrite the icon `src` to the served public path on success.
//!
//! # Invariants
//! - A non-remote `src` passes through untouched.
//! - Failure to create the destination directory is fatal for the save.
//! - A failed download never fails the save: the original remote `src` is
//!   kept and the failure is logged.
//! - Cached files land at `<root>/ext-resources/images/<YYYYMMDD>/<id>.<ext>`
//!   and are served as `/ext-resources/images/<YYYYMMDD>/<id>.<ext>`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use crate::model::card::CardIcon;

/// Public URL prefix under which cached icons are served.
pub const ICON_PUBLIC_PREFIX: &str = "/ext-resources/images";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub type IconCacheResult<T> = Result<T, IconCacheError>;

/// Fatal icon-cache failures; download failures are handled internally.
#[derive(Debug)]
pub enum IconCacheError {
    /// Destination directory could not be created.
    ResourceWrite { path: PathBuf, source: io::Error },
    /// Blocking HTTP client construction failed.
    HttpClient(reqwest::Error),
}

impl Display for IconCacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResourceWrite { path, source } => {
                write!(
                    f,
                    "failed to create icon cache directory `{}`: {source}",
                    path.display()
                )
            }
            Self::HttpClient(err) => write!(f, "failed to build icon http client: {err}"),
        }
    }
}

impl Error for IconCacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ResourceWrite { source, .. } => Some(source),
            Self::HttpClient(err) => Some(err),
        }
    }
}

#[derive(Debug)]
enum DownloadError {
    Http(reqwest::Error),
    Write(io::Error),
}

impl Display for DownloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "writing downloaded bytes failed: {err}"),
        }
    }
}

/// Downloads remote card icons into local storage.
pub struct IconCacheFetcher {
    storage_root: PathBuf,
    client: reqwest::blocking::Client,
}

impl IconCacheFetcher {
    /// Creates a fetcher writing below `storage_root`.
    ///
    /// The download client carries a bounded timeout so one slow icon host
    /// cannot stall a save indefinitely.
    pub fn try_new(storage_root: impl Into<PathBuf>) -> IconCacheResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(IconCacheError::HttpClient)?;
        Ok(Self {
            storage_root: storage_root.into(),
            client,
        })
    }

    /// Mirrors a remote icon to local storage, best effort.
    ///
    /// Returns the icon with `src` rewritten to the served public path on a
    /// successful download, the unchanged icon when `src` is already local or
    /// when the download fails, and `ResourceWrite` when the destination
    /// directory cannot be created.
    pub fn cache_icon(&self, mut icon: CardIcon) -> IconCacheResult<CardIcon> {
        if !icon.src.starts_with("http") {
            return Ok(icon);
        }

        let public_path = build_public_path(&icon.src);
        let destination = self
            .storage_root
            .join(public_path.trim_start_matches('/'));
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| IconCacheError::ResourceWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        match self.download_to(&icon.src, &destination) {
            Ok(()) => {
                info!(
                    "event=icon_cache module=icon status=ok src={} dest={public_path}",
                    icon.src
                );
                icon.src = public_path;
                Ok(icon)
            }
            Err(err) => {
                error!(
                    "event=icon_cache module=icon status=error src={} error={err} \
                     fallback=remote_src",
                    icon.src
                );
                Ok(icon)
            }
        }
    }

    fn download_to(&self, src: &str, destination: &Path) -> Result<(), DownloadError> {
        let response = self
            .client
            .get(src)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(DownloadError::Http)?;
        let bytes = response.bytes().map_err(DownloadError::Http)?;
        fs::write(destination, &bytes).map_err(DownloadError::Write)?;
        Ok(())
    }
}

/// Builds the served path `/ext-resources/images/<YYYYMMDD>/<id>[.<ext>]`.
fn build_public_path(src: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    let id = Uuid::new_v4().simple();
    match source_extension(src) {
        Some(ext) => format!("{ICON_PUBLIC_PREFIX}/{date}/{id}.{ext}"),
        None => format!("{ICON_PUBLIC_PREFIX}/{date}/{id}"),
    }
}

/// Extracts the file extension from a source URL, ignoring query/fragment.
fn source_extension(src: &str) -> Option<&str> {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = last_segment.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::{build_public_path, source_extension, ICON_PUBLIC_PREFIX};

    #[test]
    fn extension_comes_from_the_path_not_the_query() {
        assert_eq!(source_extension("http://host/a/b/icon.png"), Some("png"));
        assert_eq!(source_extension("http://host/icon.svg?v=2#top"), Some("svg"));
        assert_eq!(source_extension("http://host/no-extension"), None);
        assert_eq!(source_extension("http://host/odd.na.me.ICO"), Some("ICO"));
    }

    #[test]
    fn public_path_has_date_folder_and_unique_name() {
        let path = build_public_path("http://host/logo.png");
        let mut parts = path
            .strip_prefix(ICON_PUBLIC_PREFIX)
            .expect("path should start with the public prefix")
            .trim_start_matches('/')
            .split('/');

        let date = parts.next().expect("date folder");
        assert_eq!(date.len(), 8);
        assert!(date.chars().all(|ch| ch.is_ascii_digit()));

        let file = parts.next().expect("file name");
        assert!(file.ends_with(".png"));
        assert_eq!(file.len(), 32 + ".png".len());

        assert_ne!(path, build_public_path("http://host/logo.png"));
    }
}
