//! Program tree handed to the runtime by the parser.
//!
//! Nodes are immutable once a [`Tree`] is built. The runtime reads only
//! their identity and kind; the payload exists for the evaluator.
mod hash;
mod kind;
mod tree;

pub use hash::*;
pub use kind::*;
pub use tree::*;
