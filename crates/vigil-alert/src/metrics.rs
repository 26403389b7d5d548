use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every concurrent check.
#[derive(Debug, Default)]
pub struct CheckerMetrics {
    checks: AtomicU64,
    check_errors: AtomicU64,
}

impl CheckerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_check(&self) {
        self.checks.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an unclassified evaluation failure.
    pub fn mark_check_error(&self) {
        self.check_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    pub fn check_errors(&self) -> u64 {
        self.check_errors.load(Ordering::Relaxed)
    }
}
