//! Timestamped cache cells.

/// A value with the Unix time it was last fetched.
///
/// A cell that has never been stored is stale regardless of expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cached<T> {
    value: T,
    fetched_at: Option<i64>,
    populated: bool,
}

impl<T> Cached<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: None,
            populated: false,
        }
    }

    /// Fresh iff fetched and `now - fetched_at < expiry_secs`.
    pub fn is_fresh(&self, now: i64, expiry_secs: i64) -> bool {
        self.fetched_at
            .is_some_and(|at| now.saturating_sub(at) < expiry_secs)
    }

    /// Last stored value, fresh or not.
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn fetched_at(&self) -> Option<i64> {
        self.fetched_at
    }

    /// True once a value has been stored, even if since invalidated.
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn store(&mut self, value: T, now: i64) {
        self.value = value;
        self.fetched_at = Some(now);
        self.populated = true;
    }

    /// Mark stale, keeping the last value as a fallback.
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }
}
