//! Source positions and diagnostics shared by the strand crates.

mod diagnostic;
mod kind;
mod span;

pub use diagnostic::{Diagnostic, codes};
pub use kind::{DiagnosticKind, DiagnosticsFormatter};
pub use span::{ByteIndex, Span};
