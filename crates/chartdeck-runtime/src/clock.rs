#![forbid(unsafe_code)]

//! Host-driven monotonic clock.
//!
//! The runtime never reads wall time. Hosts advance this clock (from
//! `performance.now()` deltas on the web, or explicitly in tests), which keeps
//! timeouts and notice expiry deterministic.

use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostClock {
    now: Duration,
}

impl HostClock {
    /// A clock starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_saturates() {
        let mut clock = HostClock::new();
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(250));
        clock.advance(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::MAX);
    }
}
