//! Time source for commitment windows and lease expiries.
//!
//! The core never reads the wall clock directly: every component takes an
//! injected [`Clock`], the analogue of the ledger's block timestamp. Windows
//! are therefore only as precise as that clock's bounded drift. Tests drive
//! a [`ManualClock`] to step through commitment and grace windows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch as observed by the ledger clock.
pub type Timestamp = u64;

/// Monotonic time source shared by all components.
pub trait Clock: Send + Sync {
    /// Current ledger time in seconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock backed time source for live deployments.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually advanced time source for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock starting at the given timestamp.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute timestamp. Never moves backwards.
    pub fn set(&self, timestamp: Timestamp) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
