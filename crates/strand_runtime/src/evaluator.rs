//! The seam between the runtime and the language semantics.

use std::sync::Arc;

use smallvec::SmallVec;
use strand_core::Value;
use strand_ir::Node;

use crate::context::EvalContext;
use crate::errors::EvalError;

/// How the evaluator classifies a node for memoization.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Deterministic and free of side effects.
    pub cacheable: bool,
    /// Bindings the node reads. `None` means the evaluator cannot tell,
    /// which makes the node uncacheable regardless of `cacheable`.
    pub free_variables: Option<SmallVec<[Arc<str>; 4]>>,
}

impl Classification {
    pub fn opaque() -> Self {
        Self::default()
    }

    /// Pure node reading exactly `vars`.
    pub fn pure<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Self {
            cacheable: true,
            free_variables: Some(vars.into_iter().map(Into::into).collect()),
        }
    }
}

/// Re-entry point handed to [`Evaluator::visit`]; children must be
/// evaluated through it, never by calling `visit` directly.
pub trait Recurse {
    fn evaluate(&self, node: &Node, ctx: &mut EvalContext) -> Result<Value, EvalError>;
}

/// Per-kind semantics supplied by the interpreter.
pub trait Evaluator {
    fn classify(&self, node: &Node) -> Classification {
        let _ = node;
        Classification::opaque()
    }

    fn visit(
        &self,
        node: &Node,
        ctx: &mut EvalContext,
        recurse: &dyn Recurse,
    ) -> Result<Value, EvalError>;
}

impl<E: Evaluator + ?Sized> Evaluator for Arc<E> {
    fn classify(&self, node: &Node) -> Classification {
        (**self).classify(node)
    }

    fn visit(
        &self,
        node: &Node,
        ctx: &mut EvalContext,
        recurse: &dyn Recurse,
    ) -> Result<Value, EvalError> {
        (**self).visit(node, ctx, recurse)
    }
}
