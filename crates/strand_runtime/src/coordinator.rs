//! The per-node dispatch path.
//!
//! Order of operations for one node:
//! cache lookup, depth guard, cycle guard, cancellation check, evaluator
//! visit, guard release (cycle then depth), cache fill, metrics.
//! A cache hit returns before any guard is touched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strand_core::Value;
use strand_ir::Node;
use tracing::{debug, trace, warn};

use crate::cache::{ExecutionCache, Lookup};
use crate::context::EvalContext;
use crate::errors::EvalError;
use crate::evaluator::{Evaluator, Recurse};
use crate::fingerprint::fingerprint;
use crate::metrics::{MetricsCollector, Outcome};

/// Borrowed view over a runtime's collaborators. Cheap to build per call;
/// it is also the [`Recurse`] handle the evaluator receives.
pub struct Coordinator<'r, E: ?Sized> {
    evaluator: &'r E,
    cache: Option<&'r ExecutionCache>,
    metrics: &'r MetricsCollector,
}

impl<E: ?Sized> Clone for Coordinator<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for Coordinator<'_, E> {}

#[inline]
fn elapsed(started: Option<Instant>) -> Duration {
    started.map(|t| t.elapsed()).unwrap_or_default()
}

impl<'r, E: Evaluator + ?Sized> Coordinator<'r, E> {
    /// `cache: None` evaluates every node uncached.
    pub fn new(
        evaluator: &'r E,
        cache: Option<&'r ExecutionCache>,
        metrics: &'r MetricsCollector,
    ) -> Self {
        Self {
            evaluator,
            cache,
            metrics,
        }
    }

    pub fn evaluate(&self, node: &Node, ctx: &mut EvalContext) -> Result<Value, EvalError> {
        let started = self.metrics.is_enabled().then(Instant::now);
        let kind = node.kind;

        let mut pending = None;
        if let Some(cache) = self.cache {
            if let Some(key) = fingerprint(self.evaluator, node, ctx) {
                let generation = cache.generation();
                match cache.lookup(&key) {
                    Lookup::Hit(value) => {
                        trace!(target: "strand::coordinator", node = %node.id, %kind, "cache hit");
                        self.metrics.record(kind, Outcome::CacheHit, elapsed(started));
                        return Ok(value);
                    }
                    Lookup::Miss => {
                        trace!(target: "strand::coordinator", node = %node.id, %kind, "cache miss");
                        self.metrics.record_miss(kind);
                        pending = Some((key, generation));
                    }
                    Lookup::Bypass(err) => {
                        warn!(
                            target: "strand::coordinator",
                            %err,
                            "bypassing inconsistent cache slot"
                        );
                        self.metrics.record_bypass(kind);
                    }
                }
            }
        }

        // Guards borrow this handle, leaving `ctx` free for the evaluator.
        let state = Arc::clone(ctx.state());
        let depth_guard = match state.depth().enter(node.id) {
            Ok(g) => g,
            Err(err) => {
                self.metrics.record(kind, Outcome::Rejected, elapsed(started));
                return Err(err);
            }
        };
        let depth = depth_guard.depth();
        let cycle_guard = match state.cycles().enter(node.id, depth) {
            Ok(g) => g,
            Err(err) => {
                drop(depth_guard);
                self.metrics.observe_depth(depth);
                self.metrics.record(kind, Outcome::Rejected, elapsed(started));
                return Err(err);
            }
        };

        if ctx.is_cancelled() {
            drop(cycle_guard);
            drop(depth_guard);
            debug!(target: "strand::coordinator", node = %node.id, depth, "evaluation cancelled");
            self.metrics.observe_depth(depth);
            self.metrics.record_cancellation();
            self.metrics.record(kind, Outcome::Rejected, elapsed(started));
            return Err(EvalError::Cancelled);
        }

        let result = self.evaluator.visit(node, ctx, self);

        drop(cycle_guard);
        drop(depth_guard);
        self.metrics.observe_depth(depth);

        let outcome = match &result {
            Ok(value) => {
                if let (Some(cache), Some((key, generation))) = (self.cache, pending) {
                    if !cache.put_if_current(key, value.clone(), generation) {
                        trace!(
                            target: "strand::coordinator",
                            node = %node.id,
                            "cache invalidated during evaluation; result not stored"
                        );
                    }
                }
                Outcome::Completed
            }
            Err(_) => Outcome::Failed,
        };
        self.metrics.record(kind, outcome, elapsed(started));
        result
    }
}

impl<E: Evaluator + ?Sized> Recurse for Coordinator<'_, E> {
    fn evaluate(&self, node: &Node, ctx: &mut EvalContext) -> Result<Value, EvalError> {
        Coordinator::evaluate(self, node, ctx)
    }
}
