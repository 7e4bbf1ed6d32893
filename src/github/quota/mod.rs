//! Process-wide request quota for the GitHub API.
//!
//! GitHub enforces a single account-wide quota (5000 requests per hour for an
//! authenticated token), so every outbound call from every crawl job goes
//! through one shared [`QuotaLimiter`]. The limiter keeps a local estimate of
//! the fixed window and replaces it with the server's figures whenever a
//! response carries `X-RateLimit-*` headers.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::IntakeError;
use super::rate_limit::{RateLimitInfo, unix_now};

/// Default number of requests GitHub allows per window for a token.
pub const DEFAULT_MAX_REQUESTS: u32 = 5000;

/// Default quota window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

/// Quota limits applied by a [`QuotaLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSettings {
    /// Maximum requests allowed per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug)]
struct WindowState {
    request_count: u32,
    window_start: Instant,
}

/// Fixed-window request limiter shared by all outbound GitHub calls.
#[derive(Debug)]
pub struct QuotaLimiter {
    settings: QuotaSettings,
    state: Mutex<WindowState>,
}

impl QuotaLimiter {
    /// Creates a limiter whose first window starts now.
    #[must_use]
    pub fn new(settings: QuotaSettings) -> Self {
        Self {
            settings: QuotaSettings {
                max_requests: settings.max_requests.max(1),
                window: settings.window,
            },
            state: Mutex::new(WindowState {
                request_count: 0,
                window_start: Instant::now(),
            }),
        }
    }

    /// Returns the limits this limiter enforces.
    #[must_use]
    pub const fn settings(&self) -> QuotaSettings {
        self.settings
    }

    /// Waits until the current window has capacity, then claims one request.
    ///
    /// The lock is released while waiting, so one blocked caller never
    /// serialises the others.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::Cancelled`] when `cancel` fires before capacity
    /// becomes available. The request count is not changed in that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), IntakeError> {
        loop {
            if cancel.is_cancelled() {
                return Err(IntakeError::Cancelled);
            }

            let wait = {
                let mut state = self.lock_state();
                self.roll_window(&mut state, Instant::now());

                if state.request_count < self.settings.max_requests {
                    state.request_count += 1;
                    debug!(
                        request_count = state.request_count,
                        max_requests = self.settings.max_requests,
                        "claimed API request slot"
                    );
                    return Ok(());
                }

                self.settings
                    .window
                    .saturating_sub(state.window_start.elapsed())
            };

            warn!(wait_ms = wait.as_millis(), "API quota exhausted; waiting for window reset");

            tokio::select! {
                () = sleep(wait) => {}
                () = cancel.cancelled() => return Err(IntakeError::Cancelled),
            }
        }
    }

    /// Replaces the local estimate with the quota reported by GitHub.
    ///
    /// A hint with zero remaining requests is ignored; the local counter
    /// already blocks callers at the maximum.
    pub fn apply_quota_hint(&self, hint: &RateLimitInfo) {
        if hint.remaining() == 0 {
            return;
        }

        let now = Instant::now();
        let window_start = self.window_start_for_reset(hint.reset_at(), now);

        let mut state = self.lock_state();
        state.request_count = self
            .settings
            .max_requests
            .saturating_sub(hint.remaining());
        state.window_start = window_start;
        debug!(
            server_limit = hint.limit(),
            remaining = hint.remaining(),
            reset_at = hint.reset_at(),
            "applied server quota hint"
        );
    }

    /// Returns how many requests can still be made in the current window.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        let mut state = self.lock_state();
        self.roll_window(&mut state, Instant::now());
        self.settings
            .max_requests
            .saturating_sub(state.request_count)
    }

    fn roll_window(&self, state: &mut WindowState, now: Instant) {
        if now.saturating_duration_since(state.window_start) >= self.settings.window {
            state.request_count = 0;
            state.window_start = now;
        }
    }

    /// Maps a Unix reset timestamp onto the monotonic clock as
    /// `reset_at - window`.
    fn window_start_for_reset(&self, reset_at: u64, now: Instant) -> Instant {
        let window_secs = self.settings.window.as_secs();
        let start_unix = reset_at.saturating_sub(window_secs);
        let now_unix = unix_now();

        if start_unix >= now_unix {
            // Windows cannot start in the future on the monotonic clock.
            return now;
        }

        let elapsed = Duration::from_secs(now_unix - start_unix);
        now.checked_sub(elapsed).unwrap_or(now)
    }

    fn lock_state(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QuotaLimiter {
    fn default() -> Self {
        Self::new(QuotaSettings::default())
    }
}

#[cfg(test)]
mod tests;
