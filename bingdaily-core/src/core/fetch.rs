//! HTTP GET with bounded retries and exponential backoff.
//!
//! Every failure (connection, timeout, non-2xx status) is retried until the
//! policy's attempt budget is spent. The delay after failed attempt `n` is
//! `initial_backoff * multiplier^(n-1)`, without jitter or cap.

use std::time::Duration;

use log::{debug, warn};

use crate::error::{NetworkError, PolicyError};
use crate::services::{AttoTransport, HttpTransport, Sleeper, ThreadSleeper};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    backoff_multiplier: f64,
    timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        backoff_multiplier: f64,
        timeout: Duration,
    ) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if initial_backoff.is_zero() {
            return Err(PolicyError::ZeroBackoff);
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(PolicyError::Multiplier(backoff_multiplier));
        }
        if timeout.is_zero() {
            return Err(PolicyError::ZeroTimeout);
        }

        Ok(Self {
            max_attempts,
            initial_backoff,
            backoff_multiplier,
            timeout,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Per-request timeout used when the caller does not pass its own.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Sum of every delay a fully failing fetch sleeps through.
    pub fn worst_case_delay(&self) -> Duration {
        (1..self.max_attempts)
            .map(|attempt| self.backoff_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[derive(Debug)]
pub struct ResilientFetcher<T = AttoTransport, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_services(AttoTransport::default(), ThreadSleeper, policy)
    }
}

impl<T: HttpTransport, S: Sleeper> ResilientFetcher<T, S> {
    pub fn with_services(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn fetch(&self, url: &str) -> Result<Vec<u8>, NetworkError> {
        self.fetch_with_timeout(url, self.policy.timeout)
    }

    /// GET `url`, retrying until it succeeds or the attempt budget is spent.
    ///
    /// On exhaustion the returned error carries the final attempt's failure.
    pub fn fetch_with_timeout(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, NetworkError> {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 1u32;

        loop {
            debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);
            match self.transport.get(url, timeout) {
                Ok(body) => {
                    debug!("GET {} returned {} bytes", url, body.len());
                    return Ok(body);
                }
                Err(source) if attempt >= max_attempts => {
                    return Err(NetworkError {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    let delay = self.policy.backoff_after(attempt);
                    warn!(
                        "HTTP GET failed (attempt {}/{}) for {}: {}. Retrying in {:.1}s...",
                        attempt,
                        max_attempts,
                        url,
                        e,
                        delay.as_secs_f64()
                    );
                    self.sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
