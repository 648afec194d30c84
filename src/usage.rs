//! Usage ledger: billed amounts per caller per resource.
//!
//! The gate appends to the ledger after every allowed request; settlement
//! and reporting read it out via [`UsageTracker::snapshot`]. The ledger is
//! process-lifetime only and never decremented by the gate itself.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-identity, per-resource accumulated amounts.
pub type UsageReport = HashMap<String, HashMap<String, f64>>;

/// Accumulates billed amounts. Cloning shares the underlying ledger.
#[derive(Clone, Default)]
pub struct UsageTracker {
    ledger: Arc<Mutex<UsageReport>>,
}

impl UsageTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the running total for (`identity`, `resource`).
    pub fn record(&self, identity: &str, resource: &str, amount: f64) {
        let mut ledger = self.ledger.lock();
        *ledger
            .entry(identity.to_string())
            .or_default()
            .entry(resource.to_string())
            .or_default() += amount;
    }

    /// Accumulated amount for (`identity`, `resource`), zero if never billed.
    #[must_use]
    pub fn total(&self, identity: &str, resource: &str) -> f64 {
        self.ledger
            .lock()
            .get(identity)
            .and_then(|by_resource| by_resource.get(resource))
            .copied()
            .unwrap_or(0.0)
    }

    /// Clone of the full ledger for settlement or reporting.
    #[must_use]
    pub fn snapshot(&self) -> UsageReport {
        self.ledger.lock().clone()
    }

    /// External reset hook: drop all accumulated usage.
    pub fn clear(&self) {
        self.ledger.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_per_identity_and_resource() {
        let tracker = UsageTracker::new();
        tracker.record("u1", "search", 0.01);
        tracker.record("u1", "search", 0.01);
        tracker.record("u1", "reports", 0.25);
        tracker.record("u2", "search", 0.01);

        assert!((tracker.total("u1", "search") - 0.02).abs() < 1e-9);
        assert!((tracker.total("u1", "reports") - 0.25).abs() < 1e-9);
        assert!((tracker.total("u2", "search") - 0.01).abs() < 1e-9);
        assert!(tracker.total("u3", "search").abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_and_clear() {
        let tracker = UsageTracker::new();
        tracker.record("u1", "search", 0.01);

        let report = tracker.snapshot();
        assert_eq!(report.len(), 1);
        assert!(report["u1"].contains_key("search"));

        tracker.clear();
        assert!(tracker.snapshot().is_empty());
        // The snapshot taken earlier is unaffected.
        assert!(report["u1"].contains_key("search"));
    }
}
