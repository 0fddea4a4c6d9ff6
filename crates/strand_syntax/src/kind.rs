use crate::codes;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    // Guards
    RecursionLimitExceeded(usize),
    CircularReference(Vec<String>),
    Cancelled,

    // Evaluation
    UndefinedIdentifier(String),
    DivisionByZero,
    IntegerOverflow,
    NotCallable(String),
    TypeMismatch {
        expected: String,
        actual: String,
    },
    InvalidUnaryOperand {
        op: char,
        expected: String,
    },
    ExternalCallFailed {
        target: String,
        message: String,
    },

    // Custom
    Raw(String),
}

impl DiagnosticKind {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DiagnosticKind::RecursionLimitExceeded(_) => Some(codes::RECURSION_LIMIT),
            DiagnosticKind::CircularReference(_) => Some(codes::CIRCULAR_REFERENCE),
            DiagnosticKind::Cancelled => Some(codes::CANCELLED),
            DiagnosticKind::UndefinedIdentifier(_) => Some(codes::UNDEFINED_IDENTIFIER),
            DiagnosticKind::TypeMismatch { .. } => Some(codes::TYPE_MISMATCH),
            _ => None,
        }
    }
}

pub struct DiagnosticsFormatter;

impl DiagnosticsFormatter {
    fn format_en(kind: &DiagnosticKind) -> String {
        match kind {
            DiagnosticKind::RecursionLimitExceeded(limit) => {
                format!("Recursion limit exceeded (maximum depth {})", limit)
            }
            DiagnosticKind::CircularReference(chain) => {
                format!("Circular reference: {}", chain.join(" -> "))
            }
            DiagnosticKind::Cancelled => "Evaluation cancelled".into(),

            DiagnosticKind::UndefinedIdentifier(name) => format!("Undefined identifier: {}", name),
            DiagnosticKind::DivisionByZero => "Division by zero".into(),
            DiagnosticKind::IntegerOverflow => "Integer overflow".into(),
            DiagnosticKind::NotCallable(name) => format!("'{}' is not callable", name),
            DiagnosticKind::TypeMismatch { expected, actual } => {
                format!("Type mismatch: expected {} but got {}", expected, actual)
            }
            DiagnosticKind::InvalidUnaryOperand { op, expected } => {
                format!("Unary operator '{}' expects {} type", op, expected)
            }
            DiagnosticKind::ExternalCallFailed { target, message } => {
                format!("Call to '{}' failed: {}", target, message)
            }

            DiagnosticKind::Raw(s) => s.clone(),
        }
    }

    pub fn format(kind: &DiagnosticKind) -> String {
        Self::format_en(kind)
    }
}
