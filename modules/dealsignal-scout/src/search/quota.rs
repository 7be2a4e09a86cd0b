use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Caps how many search calls one run may issue against the shared,
/// quota-limited provider. Thread-safe via atomics for concurrent queries.
pub struct QueryQuota {
    /// Max calls per run. 0 = unlimited.
    limit: u64,
    used: AtomicU64,
}

impl QueryQuota {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            used: AtomicU64::new(0),
        }
    }

    /// Reserve one call. Returns false (and reserves nothing) when exhausted.
    pub fn try_acquire(&self) -> bool {
        if self.limit == 0 {
            self.used.fetch_add(1, Ordering::Relaxed);
            return true;
        }
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Calls remaining (u64::MAX if unlimited).
    pub fn remaining(&self) -> u64 {
        if self.limit == 0 {
            return u64::MAX;
        }
        self.limit.saturating_sub(self.used())
    }

    /// Whether a limit is in force (limit > 0).
    pub fn is_active(&self) -> bool {
        self.limit > 0
    }

    pub fn log_status(&self) {
        if self.is_active() {
            info!(
                used = self.used(),
                remaining = self.remaining(),
                limit = self.limit,
                "Search quota status"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_quota_always_acquires() {
        let quota = QueryQuota::new(0);
        for _ in 0..1000 {
            assert!(quota.try_acquire());
        }
        assert!(!quota.is_active());
        assert_eq!(quota.remaining(), u64::MAX);
    }

    #[test]
    fn quota_tracks_use() {
        let quota = QueryQuota::new(3);
        assert!(quota.try_acquire());
        assert!(quota.try_acquire());
        assert_eq!(quota.used(), 2);
        assert_eq!(quota.remaining(), 1);
    }

    #[test]
    fn exhausted_quota_refuses_without_counting() {
        let quota = QueryQuota::new(1);
        assert!(quota.try_acquire());
        assert!(!quota.try_acquire());
        assert!(!quota.try_acquire());
        assert_eq!(quota.used(), 1);
        assert_eq!(quota.remaining(), 0);
    }
}
