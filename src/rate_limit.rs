//! Per-identity sliding-window rate limiting.
//!
//! Each identity keeps the timestamps of its requests inside the trailing
//! window. The sequence is pruned before every count check, so a burst ages
//! out smoothly instead of resetting at window boundaries (which is why a
//! fixed-window counter is not used here).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sliding-window request limiter keyed by identity.
///
/// Cloning shares the underlying windows. The prune-count-append sequence
/// for one identity runs under a single lock acquisition, so concurrent
/// admissions are counted exactly and a cancelled request can never leave a
/// half-written window.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter with the given window length.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            window,
        }
    }

    /// Admit or reject a request from `identity`.
    ///
    /// Prunes timestamps older than the window, admits iff fewer than
    /// `max_per_window` remain, and records the admission. A rejected
    /// attempt leaves the window untouched.
    pub fn admit(&self, identity: &str, max_per_window: u32) -> bool {
        self.admit_at(identity, max_per_window, Instant::now())
    }

    fn admit_at(&self, identity: &str, max_per_window: u32, now: Instant) -> bool {
        let mut windows = self.windows.lock();

        let count = match windows.get_mut(identity) {
            Some(timestamps) => {
                timestamps.retain(|ts| now.duration_since(*ts) < self.window);
                timestamps.len()
            }
            None => 0,
        };

        if count >= max_per_window as usize {
            debug!(identity, count, max_per_window, "rate limit exceeded");
            // Fully aged-out windows are dropped rather than kept empty.
            if count == 0 {
                windows.remove(identity);
            }
            return false;
        }

        windows.entry(identity.to_string()).or_default().push(now);
        true
    }

    /// How long until the oldest in-window request ages out, i.e. when a
    /// currently rejected caller is worth retrying. Whole window if the
    /// identity has no recorded requests.
    #[must_use]
    pub fn retry_after(&self, identity: &str) -> Duration {
        let now = Instant::now();
        self.windows
            .lock()
            .get(identity)
            .and_then(|timestamps| {
                timestamps
                    .iter()
                    .map(|ts| now.duration_since(*ts))
                    .filter(|age| *age < self.window)
                    .max()
                    .map(|oldest_age| self.window - oldest_age)
            })
            .unwrap_or(self.window)
    }

    /// Number of requests currently inside `identity`'s window.
    #[must_use]
    pub fn in_window(&self, identity: &str) -> usize {
        let now = Instant::now();
        self.windows
            .lock()
            .get(identity)
            .map_or(0, |timestamps| {
                timestamps
                    .iter()
                    .filter(|ts| now.duration_since(**ts) < self.window)
                    .count()
            })
    }

    /// Configured window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
