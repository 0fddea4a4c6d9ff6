//! Strand evaluation runtime.
//!
//! Sits between the interpreter and its per-node evaluator. Every node
//! visit goes through [`Runtime::evaluate`], which memoizes pure nodes,
//! bounds logical recursion depth, rejects re-entrant evaluation of a node
//! that is still in progress, and records per-kind metrics.

#![allow(clippy::new_without_default)]

mod cache;
mod config;
mod context;
mod coordinator;
mod errors;
mod evaluator;
mod fingerprint;
mod guards;
mod metrics;
mod runtime;
mod shared;

pub use cache::{CacheEntry, ExecutionCache, Lookup};
pub use config::RuntimeConfig;
pub use context::{CancelToken, EvalContext};
pub use coordinator::Coordinator;
pub use errors::{CacheInconsistency, EvalError};
pub use evaluator::{Classification, Evaluator, Recurse};
pub use fingerprint::{Fingerprint, fingerprint};
pub use guards::{CallFrame, CycleDetector, CycleGuard, DepthGuard, DepthMonitor, ExecutionState};
pub use metrics::{KindStats, MetricsCollector, MetricsSnapshot, Outcome};
pub use runtime::Runtime;
pub use shared::{ModuleScope, MutationEvent, SharedState};

pub use strand_core::{Env, Value};
pub use strand_ir::{Node, NodeId, NodeKind};
