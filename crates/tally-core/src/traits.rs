//! Boundary traits.
//!
//! - [`KeyValueStore`]: persistence for balances, price multipliers and
//!   per-wallet history (tally-manager implements)
//! - [`Clock`]: wall-clock source for cache freshness, replaceable in tests

use serde_json::Value;

use crate::error::StorageError;

/// Simple JSON key-value persistence.
///
/// Implementations use interior mutability so a single store can be shared
/// (behind an `Arc`) between the controller and its wallets.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Returns `None` if the key was never written.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually advanced clock for tests.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct ManualClock(std::sync::atomic::AtomicI64);

#[cfg(any(test, feature = "testing"))]
impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(std::sync::atomic::AtomicI64::new(now))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "testing"))]
impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}
