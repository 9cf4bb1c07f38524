//! Unary and binary operators.
//!
//! The operator set (and its printable forms) matches the source
//! language's primitive operations. Comparison and logic operators are
//! included so conditionals have something to branch on.

use std::fmt;

/// Unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation: `-x`.
    Minus,
    /// Bitwise complement: `~x`.
    BitNot,
    /// Logical negation: `!x`.
    LogicNot,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Minus => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::LogicNot => "!",
        };
        f.write_str(s)
    }
}

/// Binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    BitAnd,
    BitXor,
    BitOr,
    Eq,
    Neq,
    Lt,
    Leq,
    LogicAnd,
    LogicOr,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::LogicAnd => "&&",
            BinaryOp::LogicOr => "||",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_display_forms() {
        assert_eq!(BinaryOp::Leq.to_string(), "<=");
        assert_eq!(BinaryOp::LogicOr.to_string(), "||");
        assert_eq!(UnaryOp::LogicNot.to_string(), "!");
    }
}
