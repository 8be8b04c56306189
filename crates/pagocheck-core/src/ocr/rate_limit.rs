//! Sliding-window request limiter.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::RateLimitError;

/// Allows at most `max_requests` acquisitions in any trailing `window`.
///
/// Rejections are immediate; callers are never queued.
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    stamps: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            stamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a request, or fail if the window is full.
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut stamps = self.stamps.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        while let Some(oldest) = stamps.front() {
            if now.duration_since(*oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() as u32 >= self.max_requests {
            let retry_after = stamps
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(RateLimitError {
                limit: self.max_requests,
                window: self.window,
                retry_after,
            });
        }

        stamps.push_back(now);
        Ok(())
    }

    /// Requests currently counted in the window.
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        let stamps = self.stamps.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        stamps
            .iter()
            .filter(|stamp| now.duration_since(**stamp) < self.window)
            .count()
    }
}
