// Service traits and default implementations for dependency injection
use std::path::Path;
use std::time::Duration;

use crate::error::{ApplyError, TransportError};

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Service trait for a single HTTP GET, no retries
pub trait HttpTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// Service trait for the pause between retries
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Service trait for wallpaper operations
pub trait WallpaperService {
    /// Set wallpaper from file path
    fn set_wallpaper_from_path(&self, file_path: &Path) -> Result<(), ApplyError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).get(url, timeout)
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<W: WallpaperService + ?Sized> WallpaperService for &W {
    fn set_wallpaper_from_path(&self, file_path: &Path) -> Result<(), ApplyError> {
        (**self).set_wallpaper_from_path(file_path)
    }
}

/// Blocking attohttpc client sending a fixed user agent.
#[derive(Debug, Clone)]
pub struct AttoTransport {
    user_agent: String,
}

impl AttoTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for AttoTransport {
    fn default() -> Self {
        Self::new(USER_AGENT)
    }
}

impl HttpTransport for AttoTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let response = attohttpc::get(url)
            .header(attohttpc::header::USER_AGENT, self.user_agent.as_str())
            .timeout(timeout)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        Ok(response.bytes()?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
