//! Per-execution recursion safety.
//!
//! Both guards are scoped acquisitions: the returned guard releases its
//! slot on drop, so every exit path of the coordinator (early return,
//! evaluator error, unwinding panic) gives the slot back.

mod cycle;
mod depth;

pub use cycle::{CallFrame, CycleDetector, CycleGuard};
pub use depth::{DepthGuard, DepthMonitor};

/// Guard state of one logical execution.
///
/// Never shared between executions. It lives behind the execution's
/// [`EvalContext`](crate::EvalContext), so it travels with the execution
/// if evaluation resumes on another worker.
#[derive(Debug)]
pub struct ExecutionState {
    depth: DepthMonitor,
    cycles: CycleDetector,
}

impl ExecutionState {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: DepthMonitor::new(max_depth),
            cycles: CycleDetector::new(),
        }
    }

    pub fn depth(&self) -> &DepthMonitor {
        &self.depth
    }

    pub fn cycles(&self) -> &CycleDetector {
        &self.cycles
    }

    /// No guard is held.
    pub fn is_idle(&self) -> bool {
        self.depth.current() == 0 && self.cycles.is_empty()
    }
}
