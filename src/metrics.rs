//! Counters for the persistence tiers
//!
//! Failures on either tier are swallowed, so these counters are the only
//! place they stay visible after the log line.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the bridge's callbacks and tasks
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    local_writes: AtomicU64,
    local_write_failures: AtomicU64,
    remote_writes: AtomicU64,
    remote_write_failures: AtomicU64,
    remote_applied: AtomicU64,
    rejected_payloads: AtomicU64,
}

/// Point-in-time copy of [`BridgeMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub local_writes: u64,
    pub local_write_failures: u64,
    pub remote_writes: u64,
    pub remote_write_failures: u64,
    pub remote_applied: u64,
    pub rejected_payloads: u64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_local_write(&self, ok: bool) {
        bump(if ok { &self.local_writes } else { &self.local_write_failures });
    }

    pub fn record_remote_write(&self, ok: bool) {
        bump(if ok { &self.remote_writes } else { &self.remote_write_failures });
    }

    pub fn record_remote_applied(&self) {
        bump(&self.remote_applied);
    }

    pub fn record_rejected_payload(&self) {
        bump(&self.rejected_payloads);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            local_writes: self.local_writes.load(Ordering::Relaxed),
            local_write_failures: self.local_write_failures.load(Ordering::Relaxed),
            remote_writes: self.remote_writes.load(Ordering::Relaxed),
            remote_write_failures: self.remote_write_failures.load(Ordering::Relaxed),
            remote_applied: self.remote_applied.load(Ordering::Relaxed),
            rejected_payloads: self.rejected_payloads.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "local: {} written, {} failed; remote: {} written, {} failed, {} applied; {} rejected",
            self.local_writes,
            self.local_write_failures,
            self.remote_writes,
            self.remote_write_failures,
            self.remote_applied,
            self.rejected_payloads
        )
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = BridgeMetrics::new();
        metrics.record_local_write(true);
        metrics.record_local_write(false);
        metrics.record_local_write(false);
        metrics.record_remote_write(true);
        metrics.record_rejected_payload();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.local_writes, 1);
        assert_eq!(snapshot.local_write_failures, 2);
        assert_eq!(snapshot.remote_writes, 1);
        assert_eq!(snapshot.rejected_payloads, 1);
        assert_eq!(snapshot.remote_applied, 0);
    }

    #[test]
    fn test_summary() {
        let summary = MetricsSnapshot::default().summary();
        assert!(summary.starts_with("local: 0 written, 0 failed"));
    }
}
