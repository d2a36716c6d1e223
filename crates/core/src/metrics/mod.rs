use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Fire-and-forget counters consumed by an external score display.
pub trait MetricsSink: Send + Sync {
    fn report_spawned(&self, n: u64);
    fn report_hit(&self, n: u64);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn report_spawned(&self, _n: u64) {}
    fn report_hit(&self, _n: u64) {}
}

/// Point-in-time copy of [`ScoreCounters`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub spawned: u64,
    pub hit: u64,
}

/// Atomic spawned/hit totals. Clones share the same counters, so several
/// scheduler instances can report into one score.
#[derive(Debug, Default, Clone)]
pub struct ScoreCounters {
    spawned: Arc<AtomicU64>,
    hit: Arc<AtomicU64>,
}

impl ScoreCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            spawned: self.spawned.load(Ordering::Relaxed),
            hit: self.hit.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.spawned.store(0, Ordering::Relaxed);
        self.hit.store(0, Ordering::Relaxed);
    }
}

impl MetricsSink for ScoreCounters {
    fn report_spawned(&self, n: u64) {
        self.spawned.fetch_add(n, Ordering::Relaxed);
    }

    fn report_hit(&self, n: u64) {
        self.hit.fetch_add(n, Ordering::Relaxed);
    }
}
