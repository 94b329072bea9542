//! Scripted fakes for the service traits.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ApplyError, TransportError};
use crate::services::{HttpTransport, Sleeper, WallpaperService};

/// Answers GETs from per-URL queues; an unscripted URL gets a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: RefCell<HashMap<String, VecDeque<Result<Vec<u8>, TransportError>>>>,
    requests: RefCell<Vec<(String, Duration)>>,
}

impl ScriptedTransport {
    pub fn respond(&self, url: &str, response: Result<Vec<u8>, TransportError>) -> &Self {
        self.responses
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.requests.borrow().iter().map(|(_, t)| *t).collect()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|(u, _)| u == url).count()
    }
}

impl HttpTransport for ScriptedTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.requests.borrow_mut().push((url.to_string(), timeout));
        self.responses
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Err(TransportError::Status(404)))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

#[derive(Default)]
pub struct RecordingWallpaper {
    pub applied: RefCell<Vec<PathBuf>>,
}

impl WallpaperService for RecordingWallpaper {
    fn set_wallpaper_from_path(&self, file_path: &Path) -> Result<(), ApplyError> {
        self.applied.borrow_mut().push(file_path.to_path_buf());
        Ok(())
    }
}
