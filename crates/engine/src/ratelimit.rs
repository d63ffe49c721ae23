//! Rate-limits the update loop's driver-failure logging (§4.4: "driver
//! failures are logged at a rate-limited interval, default 30s, rather than
//! once per tick"). Owned exclusively by the loop task, so no locking.

use std::time::{Duration, Instant};

pub struct FailureRateLimiter {
    window: Duration,
    consecutive_failures: u32,
    last_logged: Option<Instant>,
}

impl FailureRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            consecutive_failures: 0,
            last_logged: None,
        }
    }

    /// Call on a tick that failed to read memory. Returns whether this
    /// failure should be logged now (first failure in a streak, or the
    /// rate-limit window has elapsed since the last log).
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        let now = Instant::now();
        let should_log = match self.last_logged {
            None => true,
            Some(last) => now.duration_since(last) >= self.window,
        };
        if should_log {
            self.last_logged = Some(now);
        }
        should_log
    }

    /// Call on a tick that succeeded. If the previous streak of failures was
    /// non-empty, returns its length so the caller can log a recovery line;
    /// always resets the streak.
    pub fn record_success(&mut self) -> Option<u32> {
        let streak = self.consecutive_failures;
        self.consecutive_failures = 0;
        self.last_logged = None;
        if streak > 0 {
            Some(streak)
        } else {
            None
        }
    }
}
