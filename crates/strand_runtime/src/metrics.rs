//! Per-kind counters and timings, safe for concurrent writers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use strand_ir::NodeKind;

/// How one `evaluate` call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Answered from the cache; the evaluator was not invoked.
    CacheHit,
    /// The evaluator ran and returned a value.
    Completed,
    /// The evaluator ran and returned an error.
    Failed,
    /// A guard or the cancellation flag refused the node before the
    /// evaluator ran.
    Rejected,
}

#[derive(Default)]
struct KindCounters {
    visits: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_bypasses: AtomicU64,
    failures: AtomicU64,
    nanos: AtomicU64,
}

impl KindCounters {
    fn load(&self) -> KindStats {
        KindStats {
            visits: self.visits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_bypasses: self.cache_bypasses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.nanos.load(Ordering::Relaxed)),
        }
    }

    fn clear(&self) {
        for c in [
            &self.visits,
            &self.cache_hits,
            &self.cache_misses,
            &self.cache_bypasses,
            &self.failures,
            &self.nanos,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

/// Process-wide aggregation of evaluation statistics.
///
/// Counters are independent relaxed atomics: no update is ever lost, but a
/// snapshot taken while executions are running may mix counts from
/// slightly different instants.
pub struct MetricsCollector {
    kinds: [KindCounters; NodeKind::COUNT],
    max_depth: AtomicUsize,
    cancellations: AtomicU64,
    enabled: AtomicBool,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            kinds: std::array::from_fn(|_| KindCounters::default()),
            max_depth: AtomicUsize::new(0),
            cancellations: AtomicU64::new(0),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn record(&self, kind: NodeKind, outcome: Outcome, duration: Duration) {
        if !self.is_enabled() {
            return;
        }
        let c = &self.kinds[kind.index()];
        match outcome {
            Outcome::CacheHit => {
                c.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Completed => {
                c.visits.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed => {
                c.visits.fetch_add(1, Ordering::Relaxed);
                c.failures.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Rejected => {
                c.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        c.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn record_miss(&self, kind: NodeKind) {
        if self.is_enabled() {
            self.kinds[kind.index()].cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_bypass(&self, kind: NodeKind) {
        if self.is_enabled() {
            self.kinds[kind.index()].cache_bypasses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cancellation(&self) {
        if self.is_enabled() {
            self.cancellations.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Report the depth of a guard that has just been released.
    pub fn observe_depth(&self, depth: usize) {
        if self.is_enabled() {
            self.max_depth.fetch_max(depth, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let kinds = NodeKind::ALL
            .iter()
            .map(|k| (*k, self.kinds[k.index()].load()))
            .filter(|(_, s)| !s.is_empty())
            .collect();
        MetricsSnapshot {
            kinds,
            max_depth: self.max_depth.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for c in &self.kinds {
            c.clear();
        }
        self.max_depth.store(0, Ordering::Relaxed);
        self.cancellations.store(0, Ordering::Relaxed);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Evaluator invocations.
    pub visits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_bypasses: u64,
    pub failures: u64,
    pub total_duration: Duration,
}

impl KindStats {
    pub fn is_empty(&self) -> bool {
        *self == KindStats::default()
    }

    pub fn mean_duration(&self) -> Duration {
        let n = self.visits + self.cache_hits;
        if n == 0 {
            return Duration::ZERO;
        }
        self.total_duration / u32::try_from(n).unwrap_or(u32::MAX)
    }

    fn add(&mut self, other: &KindStats) {
        self.visits += other.visits;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.cache_bypasses += other.cache_bypasses;
        self.failures += other.failures;
        self.total_duration += other.total_duration;
    }
}

/// Point-in-time copy of the collector.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub kinds: BTreeMap<NodeKind, KindStats>,
    pub max_depth: usize,
    pub cancellations: u64,
}

impl MetricsSnapshot {
    pub fn kind(&self, kind: NodeKind) -> KindStats {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }

    pub fn totals(&self) -> KindStats {
        let mut total = KindStats::default();
        for s in self.kinds.values() {
            total.add(s);
        }
        total
    }

    /// Fraction of cache lookups that hit, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let t = self.totals();
        let lookups = t.cache_hits + t.cache_misses + t.cache_bypasses;
        if lookups == 0 {
            0.0
        } else {
            t.cache_hits as f64 / lookups as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>8} {:>8} {:>8} {:>8} {:>12} {:>10}",
            "kind", "visits", "hits", "misses", "failed", "total_us", "mean_ns"
        )?;
        for (kind, s) in &self.kinds {
            writeln!(
                f,
                "{:<12} {:>8} {:>8} {:>8} {:>8} {:>12} {:>10}",
                kind.as_str(),
                s.visits,
                s.cache_hits,
                s.cache_misses,
                s.failures,
                s.total_duration.as_micros(),
                s.mean_duration().as_nanos()
            )?;
        }
        write!(
            f,
            "max depth {}, hit rate {:.1}%, cancellations {}",
            self.max_depth,
            self.hit_rate() * 100.0,
            self.cancellations
        )
    }
}
