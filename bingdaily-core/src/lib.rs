//! Fetch Bing's image of the day into a local cache and set it as the desktop background.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use log::info;

pub mod core;
pub mod error;
pub mod services;
pub mod wallpaper;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::fetch::{ResilientFetcher, RetryPolicy};
pub use crate::core::request::{BingImage, BingResponse, ImageCandidate, MetadataResolver, Provider};
pub use crate::core::storage::{date_key, CachedDownloader, Config, DownloadResult, Resolution};
pub use crate::error::{
    ApplyError, CandidateError, DownloadError, MetadataError, NetworkError, PolicyError, RunError,
    TransportError,
};
pub use crate::services::{AttoTransport, HttpTransport, Sleeper, ThreadSleeper, WallpaperService};
pub use crate::wallpaper::GnomeWallpaper;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: Config,
    pub provider: Provider,
    /// Calendar day the cache entry is keyed on.
    pub date: NaiveDate,
    /// Stop after the image is cached.
    pub download_only: bool,
}

impl RunOptions {
    pub fn for_today(config: Config, provider: Provider) -> Self {
        Self {
            config,
            provider,
            date: Local::now().date_naive(),
            download_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub path: PathBuf,
    pub resolution: Resolution,
    pub applied: bool,
}

/// Resolve today's image, make sure it is cached, then apply it.
pub fn run_once<T, S, W>(
    options: &RunOptions,
    fetcher: &ResilientFetcher<T, S>,
    wallpaper: &W,
) -> Result<RunOutcome, RunError>
where
    T: HttpTransport,
    S: Sleeper,
    W: WallpaperService,
{
    info!("Starting Bing Wallpaper");
    options
        .config
        .ensure_cache_dir()
        .map_err(|source| RunError::CacheDir {
            path: options.config.cache_dir.clone(),
            source,
        })?;

    let key = date_key(options.date);
    let candidates = MetadataResolver::new(fetcher, &options.provider).resolve_image_urls()?;
    let download = CachedDownloader::new(fetcher, &options.config).obtain_image(&candidates, &key)?;

    if options.download_only {
        info!("Download only, leaving the wallpaper unchanged");
    } else {
        wallpaper.set_wallpaper_from_path(&download.path)?;
    }

    Ok(RunOutcome {
        path: download.path,
        resolution: download.resolution,
        applied: !options.download_only,
    })
}
