//! Error types surfaced by the evaluation runtime.

use strand_ir::NodeId;
use strand_syntax::{Diagnostic, DiagnosticKind, Span};
use thiserror::Error;

use crate::fingerprint::Fingerprint;

#[derive(Error, Debug)]
pub enum EvalError {
    // Guard failures (fatal to the execution)
    #[error("recursion limit exceeded at {node}: depth {depth} exceeds maximum of {limit}")]
    RecursionLimitExceeded {
        limit: usize,
        depth: usize,
        node: NodeId,
    },

    #[error("circular reference detected: {}", format_path(path))]
    CircularReferenceDetected { path: Vec<NodeId> },

    #[error("evaluation cancelled")]
    Cancelled,

    // Evaluator errors, passed through untouched
    #[error("{0}")]
    Raised(Diagnostic),

    #[error(transparent)]
    Evaluator(Box<dyn std::error::Error + Send + Sync>),
}

fn format_path(path: &[NodeId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl EvalError {
    pub fn raise(kind: DiagnosticKind, span: Span) -> Self {
        EvalError::Raised(Diagnostic::error_kind(kind, Some(span)))
    }

    pub fn opaque(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        EvalError::Evaluator(Box::new(err))
    }

    /// True for failures produced by the runtime's own guards.
    pub fn is_guard_failure(&self) -> bool {
        matches!(
            self,
            EvalError::RecursionLimitExceeded { .. } | EvalError::CircularReferenceDetected { .. }
        )
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvalError::RecursionLimitExceeded { limit, .. } => {
                Diagnostic::error_kind(DiagnosticKind::RecursionLimitExceeded(*limit), None)
            }
            EvalError::CircularReferenceDetected { path } => Diagnostic::error_kind(
                DiagnosticKind::CircularReference(path.iter().map(|id| id.to_string()).collect()),
                None,
            )
            .with_help("a node re-entered its own evaluation before completing"),
            EvalError::Cancelled => Diagnostic::error_kind(DiagnosticKind::Cancelled, None),
            EvalError::Raised(d) => d.clone(),
            EvalError::Evaluator(e) => Diagnostic::error(e.to_string(), None),
        }
    }
}

impl From<Diagnostic> for EvalError {
    fn from(d: Diagnostic) -> Self {
        EvalError::Raised(d)
    }
}

/// A cache slot answered a lookup with an entry for a different fingerprint.
///
/// Never fatal: the coordinator logs it and evaluates the node uncached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cache slot {digest:#018x} holds {found} but lookup expected {expected}")]
pub struct CacheInconsistency {
    pub digest: u64,
    pub expected: Fingerprint,
    pub found: Fingerprint,
}
