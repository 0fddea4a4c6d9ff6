use std::sync::atomic::{AtomicUsize, Ordering};

use strand_ir::NodeId;
use tracing::debug;

use crate::errors::EvalError;

/// Counts logical call depth for one execution and refuses entries past
/// the configured limit.
#[derive(Debug)]
pub struct DepthMonitor {
    limit: usize,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl DepthMonitor {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Deepest level reached since creation or the last `reset_peak`.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    pub fn reset_peak(&self) {
        self.peak.store(self.current(), Ordering::Relaxed);
    }

    pub fn enter(&self, node: NodeId) -> Result<DepthGuard<'_>, EvalError> {
        let depth = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        if depth > self.limit {
            self.current.fetch_sub(1, Ordering::AcqRel);
            debug!(%node, depth, limit = self.limit, "recursion limit exceeded");
            return Err(EvalError::RecursionLimitExceeded {
                limit: self.limit,
                depth,
                node,
            });
        }
        self.peak.fetch_max(depth, Ordering::Relaxed);
        Ok(DepthGuard {
            monitor: self,
            depth,
        })
    }
}

/// One occupied depth slot. Dropping it decrements the counter exactly once.
#[must_use = "dropping the guard immediately releases the depth slot"]
#[derive(Debug)]
pub struct DepthGuard<'a> {
    monitor: &'a DepthMonitor,
    depth: usize,
}

impl DepthGuard<'_> {
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.monitor.current.fetch_sub(1, Ordering::AcqRel);
    }
}
