use std::fmt;

/// Flat tag for every node the parser can produce.
///
/// The discriminant doubles as an index into per-kind tables, see
/// [`NodeKind::index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    Program,
    Block,
    Literal,
    Identifier,
    Unary,
    Binary,
    Call,
    Function,
    If,
    While,
    Assign,
    Return,
    Prompt,
    Tool,
    Import,
    Export,
}

impl NodeKind {
    pub const COUNT: usize = 16;

    pub const ALL: [NodeKind; Self::COUNT] = [
        NodeKind::Program,
        NodeKind::Block,
        NodeKind::Literal,
        NodeKind::Identifier,
        NodeKind::Unary,
        NodeKind::Binary,
        NodeKind::Call,
        NodeKind::Function,
        NodeKind::If,
        NodeKind::While,
        NodeKind::Assign,
        NodeKind::Return,
        NodeKind::Prompt,
        NodeKind::Tool,
        NodeKind::Import,
        NodeKind::Export,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Block => "block",
            NodeKind::Literal => "literal",
            NodeKind::Identifier => "identifier",
            NodeKind::Unary => "unary",
            NodeKind::Binary => "binary",
            NodeKind::Call => "call",
            NodeKind::Function => "function",
            NodeKind::If => "if",
            NodeKind::While => "while",
            NodeKind::Assign => "assign",
            NodeKind::Return => "return",
            NodeKind::Prompt => "prompt",
            NodeKind::Tool => "tool",
            NodeKind::Import => "import",
            NodeKind::Export => "export",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_indexed_by_discriminant() {
        for (i, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
