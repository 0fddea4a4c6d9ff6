//! Error reports rendered for the user.
//!
//! A [`Diagnostic`] is built from a [`DiagnosticKind`], which supplies the
//! message text and a stable error code.

use std::fmt;

use crate::{DiagnosticKind, DiagnosticsFormatter, Span};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub code: Option<&'static str>,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            message: message.into(),
            code: None,
            span,
            help: None,
        }
    }

    pub fn error_kind(kind: DiagnosticKind, span: Option<Span>) -> Self {
        Self {
            message: DiagnosticsFormatter::format(&kind),
            code: kind.code(),
            span,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Error")?;
        if let Some(code) = self.code {
            write!(f, " [{code}]")?;
        }
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(help) = &self.help {
            write!(f, " (help: {help})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

pub mod codes {
    pub const UNDEFINED_IDENTIFIER: &str = "E0001";
    pub const TYPE_MISMATCH: &str = "E0003";
    pub const CIRCULAR_REFERENCE: &str = "E0004";
    pub const RECURSION_LIMIT: &str = "E0005";
    pub const CANCELLED: &str = "E0006";
}
