use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::core::storage::Resolution;

/// Failure of a single HTTP attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Request(#[from] attohttpc::Error),
    #[error("HTTP {0}")]
    Status(u16),
}

/// Every attempt for one URL failed.
#[derive(Debug, Error)]
#[error("GET {url} failed after {attempts} attempt(s): {source}")]
pub struct NetworkError {
    pub url: String,
    pub attempts: u32,
    /// Error of the final attempt.
    pub source: TransportError,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error(transparent)]
    Fetch(#[from] NetworkError),
    #[error("malformed metadata response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metadata response contains no images")]
    NoImages,
    #[error("metadata response is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum CandidateError {
    #[error(transparent)]
    Fetch(#[from] NetworkError),
    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Both the high-resolution and the standard image failed.
#[derive(Debug, Error)]
#[error("all image downloads failed ({})", summarize(.failures))]
pub struct DownloadError {
    pub failures: Vec<(Resolution, CandidateError)>,
}

fn summarize(failures: &[(Resolution, CandidateError)]) -> String {
    failures
        .iter()
        .map(|(resolution, err)| format!("{resolution}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("cannot resolve wallpaper path {}: {source}", .path.display())]
    Canonicalize { path: PathBuf, source: io::Error },
    #[error("wallpaper path {} is not valid UTF-8", .0.display())]
    NonUtf8Path(PathBuf),
    #[error("failed to run `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
    #[error("`{command}` exited with {status}: {stderr}")]
    Status {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
    #[error("initial backoff must be greater than zero")]
    ZeroBackoff,
    #[error("backoff multiplier must be a finite number >= 1, got {0}")]
    Multiplier(f64),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot create cache directory {}: {source}", .path.display())]
    CacheDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}
