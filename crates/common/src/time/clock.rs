//! Time abstraction for testability
//!
//! Expiry checks (OAuth state TTLs, token expiry, webhook timestamp skew) read
//! the time through [`Clock`] so tests can move time forward without waiting.
//!
//! ```rust,ignore
//! use chrono::Duration;
//! use relaygate_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::minutes(11));
//! assert_eq!(clock.now() - start, Duration::minutes(11));
//! ```

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Seconds since the UNIX epoch.
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Real system clock. Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing.
///
/// Clones share the same underlying time, so a clock handed to a service can
/// be advanced from the test body.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at the current real time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a mock clock pinned to `instant`.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(instant)) }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut guard = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += duration;
    }

    /// Pin the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
