//! Global message throttle
//!
//! Drops any message arriving less than one window after the last accepted
//! message. The check runs before parsing, so malformed messages consume the
//! window too. There is no per-object throttling.

use std::time::{Duration, Instant};

pub struct EventThrottle {
    /// Minimum gap between accepted messages
    window: Duration,
    /// None until the first message is accepted
    last_accepted: Option<Instant>,
}

impl EventThrottle {
    pub fn new(window: Duration) -> Self {
        Self { window, last_accepted: None }
    }

    /// Build from a window in (fractional) seconds. Negative or NaN means no throttling.
    pub fn from_secs_f64(window_secs: f64) -> Self {
        let window = Duration::try_from_secs_f64(window_secs).unwrap_or(Duration::ZERO);
        Self::new(window)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns true and records `now` if the message may be processed.
    /// Rejected messages leave the state untouched.
    pub fn should_process(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }
}
