use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use strand_core::Value;
use strand_ir::Node;
use tracing::debug;

use crate::cache::ExecutionCache;
use crate::config::RuntimeConfig;
use crate::context::EvalContext;
use crate::coordinator::Coordinator;
use crate::errors::EvalError;
use crate::evaluator::Evaluator;
use crate::guards::ExecutionState;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::shared::SharedState;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Entry point for the interpreter.
///
/// One `Runtime` serves any number of concurrent executions: the cache and
/// metrics are shared, while each [`EvalContext`] carries its own guards.
pub struct Runtime<E> {
    id: u64,
    evaluator: E,
    cache: Arc<ExecutionCache>,
    metrics: Arc<MetricsCollector>,
    max_depth: AtomicUsize,
    cache_enabled: AtomicBool,
}

impl<E: Evaluator> Runtime<E> {
    pub fn new(evaluator: E) -> Self {
        Self::with_config(evaluator, RuntimeConfig::default())
    }

    pub fn with_config(evaluator: E, config: RuntimeConfig) -> Self {
        let metrics = MetricsCollector::new();
        metrics.set_enabled(config.metrics_enabled);
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            evaluator,
            cache: Arc::new(ExecutionCache::new(config.cache_capacity)),
            metrics: Arc::new(metrics),
            max_depth: AtomicUsize::new(config.max_depth.max(1)),
            cache_enabled: AtomicBool::new(config.cache_enabled),
        }
    }

    /// Applies to executions created afterwards; shrinking the cache
    /// evicts least-recently-used entries immediately.
    pub fn configure(&self, max_depth: usize, cache_capacity: usize) {
        let max_depth = max_depth.max(1);
        self.max_depth.store(max_depth, Ordering::Relaxed);
        self.cache.resize(cache_capacity);
        debug!(max_depth, cache_capacity = self.cache.capacity(), "runtime reconfigured");
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn config(&self) -> RuntimeConfig {
        RuntimeConfig {
            max_depth: self.max_depth.load(Ordering::Relaxed),
            cache_capacity: self.cache.capacity(),
            cache_enabled: self.cache_enabled.load(Ordering::Relaxed),
            metrics_enabled: self.metrics.is_enabled(),
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn cache(&self) -> &Arc<ExecutionCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    pub fn new_execution(&self) -> ExecutionState {
        ExecutionState::new(self.max_depth.load(Ordering::Relaxed))
    }

    pub fn new_context(&self, shared: Arc<SharedState>) -> EvalContext {
        EvalContext::new(shared, self.new_execution())
    }

    /// Drop the whole cache whenever a binding in `shared` is reassigned.
    ///
    /// Returns `false` if this runtime is already attached to `shared`. The
    /// hook unregisters itself on the first mutation after the runtime is
    /// dropped.
    pub fn attach(&self, shared: &SharedState) -> bool {
        let cache: Weak<ExecutionCache> = Arc::downgrade(&self.cache);
        shared.on_mutation(self.id, move |event| match cache.upgrade() {
            Some(cache) => {
                debug!(module = event.module, name = event.name, "shared binding reassigned");
                cache.invalidate_all();
                true
            }
            None => false,
        })
    }

    pub fn is_attached(&self, shared: &SharedState) -> bool {
        shared.is_watched_by(self.id)
    }

    pub fn coordinator(&self) -> Coordinator<'_, E> {
        let cache = self
            .cache_enabled
            .load(Ordering::Relaxed)
            .then_some(&*self.cache);
        Coordinator::new(&self.evaluator, cache, &self.metrics)
    }

    pub fn evaluate(&self, node: &Node, ctx: &mut EvalContext) -> Result<Value, EvalError> {
        self.coordinator().evaluate(node, ctx)
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Clear the cache and zero every metric.
    pub fn reset(&self) {
        self.cache.invalidate_all();
        self.metrics.reset();
    }
}
