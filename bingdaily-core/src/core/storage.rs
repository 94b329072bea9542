use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use directories::ProjectDirs;
use log::{info, warn};
use tempfile::NamedTempFile;

use crate::core::fetch::ResilientFetcher;
use crate::core::request::ImageCandidate;
use crate::error::{CandidateError, DownloadError};
use crate::services::{HttpTransport, Sleeper};

pub const CACHE_DIR_NAME: &str = "bing-wallpaper";

/// Images are larger than the metadata envelope, so they get a longer timeout.
pub const IMAGE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cache_dir: PathBuf,
}

impl Config {
    /// `<per-user cache root>/bing-wallpaper`, e.g. `~/.cache/bing-wallpaper` on Linux.
    pub fn default_cache_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", CACHE_DIR_NAME).map(|dirs| dirs.cache_dir().to_path_buf())
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Create the cache directory and its parents if they don't exist
    pub fn ensure_cache_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// One file per calendar day, independent of the image it holds.
    pub fn image_path(&self, date_key: &str) -> PathBuf {
        self.cache_dir.join(format!("bing_{}.jpg", date_key))
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    High,
    Standard,
    Cached,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::High => write!(f, "UHD"),
            Resolution::Standard => write!(f, "HD"),
            Resolution::Cached => write!(f, "cached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    pub resolution: Resolution,
}

pub struct CachedDownloader<'a, T, S> {
    fetcher: &'a ResilientFetcher<T, S>,
    config: &'a Config,
    image_timeout: Duration,
}

impl<'a, T: HttpTransport, S: Sleeper> CachedDownloader<'a, T, S> {
    pub fn new(fetcher: &'a ResilientFetcher<T, S>, config: &'a Config) -> Self {
        Self {
            fetcher,
            config,
            image_timeout: IMAGE_TIMEOUT,
        }
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    /// Return today's cached image, downloading it first if needed.
    ///
    /// The UHD candidate is tried before the standard one. Each candidate gets
    /// the fetcher's full retry budget; only when both fail is an error returned.
    pub fn obtain_image(
        &self,
        candidates: &ImageCandidate,
        date_key: &str,
    ) -> Result<DownloadResult, DownloadError> {
        let filepath = self.config.image_path(date_key);
        if filepath.exists() {
            info!("Using cached image: {}", filepath.display());
            return Ok(DownloadResult {
                path: filepath,
                resolution: Resolution::Cached,
            });
        }

        let ordered = [
            (Resolution::High, candidates.high_res_url.as_str()),
            (Resolution::Standard, candidates.standard_url.as_str()),
        ];

        let mut failures = Vec::with_capacity(ordered.len());
        for (resolution, url) in ordered {
            info!("Attempting {} download: {}", resolution, url);
            match self.download_to(url, &filepath) {
                Ok(true) => {
                    info!("Image saved to {}", filepath.display());
                    return Ok(DownloadResult {
                        path: filepath,
                        resolution,
                    });
                }
                Ok(false) => {
                    info!("Image stored concurrently at {}", filepath.display());
                    return Ok(DownloadResult {
                        path: filepath,
                        resolution: Resolution::Cached,
                    });
                }
                Err(e) => {
                    warn!("Failed to download from {}: {}", url, e);
                    failures.push((resolution, e));
                }
            }
        }

        Err(DownloadError { failures })
    }

    /// `Ok(false)` when another run stored the file while this one downloaded.
    fn download_to(&self, url: &str, filepath: &Path) -> Result<bool, CandidateError> {
        let bytes = self.fetcher.fetch_with_timeout(url, self.image_timeout)?;
        store_no_clobber(&self.config.cache_dir, filepath, &bytes).map_err(|source| {
            CandidateError::Write {
                path: filepath.to_path_buf(),
                source,
            }
        })
    }
}

// Write to a temp file in the same directory, then rename into place. An
// existing target is left untouched: another run got there first, and the
// result is `false`.
fn store_no_clobber(dir: &Path, filepath: &Path, bytes: &[u8]) -> io::Result<bool> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(filepath) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            info!("{} appeared concurrently, keeping it", filepath.display());
            Ok(false)
        }
        Err(e) => Err(e.error),
    }
}
