//! Clock and delay implementations.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::traits::{Clock, Delay};

/// Milliseconds elapsed since construction, truncated to `u32`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Clock driven by hand. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    /// Create a clock reading `start` milliseconds.
    pub fn new(start: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start)),
        }
    }

    /// Move the clock forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        // fetch_add on atomics wraps.
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep_ms(&self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Returns immediately, recording how long it was asked to sleep.
#[derive(Debug, Clone, Default)]
pub struct NoDelay {
    requested: Arc<AtomicU64>,
}

impl NoDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total milliseconds requested across all calls.
    pub fn total_ms(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Delay for NoDelay {
    fn sleep_ms(&self, ms: u32) {
        self.requested.fetch_add(u64::from(ms), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(10);
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_millis(), 15);
        other.set(100);
        assert_eq!(clock.now_millis(), 100);
    }

    #[test]
    fn manual_clock_wraps() {
        let clock = ManualClock::new(u32::MAX);
        clock.advance(2);
        assert_eq!(clock.now_millis(), 1);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now_millis();
        ThreadDelay.sleep_ms(2);
        assert!(clock.now_millis() >= first);
    }

    #[test]
    fn no_delay_records_requests() {
        let delay = NoDelay::new();
        delay.sleep_ms(10);
        delay.clone().sleep_ms(5);
        assert_eq!(delay.total_ms(), 15);
    }
}
