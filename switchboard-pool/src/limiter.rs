//! Per-provider fixed-window rate limiting.

use std::time::Duration;

use crate::provider::Provider;

/// Length of the production rate window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Client-side fixed-window limiter.
///
/// A local courtesy ceiling only: it keeps the pool from exceeding a
/// provider's configured requests-per-minute, it does not mirror the
/// backend's own enforcement. The window count is incremented by the
/// post-attempt statistics update, so the window covers attempts
/// dispatched, not attempts completed.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Limiter with the production one-minute window.
    pub fn new() -> Self {
        Self { window: WINDOW }
    }

    /// Limiter with a custom window length.
    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }

    /// Whether `provider` may take another call right now.
    ///
    /// Resets the provider's window first when it has elapsed; the reset
    /// and the check run as one step under the provider's own lock.
    pub fn permits(&self, provider: &Provider) -> bool {
        provider.window_permits(self.window)
    }
}
