use std::fmt::Display;

use crate::{lexer::tokens::TokenKind, Position};

/// An identifier together with where it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub value: String,
    pub position: Position,
}

impl Name {
    pub fn new(value: impl Into<String>, position: Position) -> Self {
        Name {
            value: value.into(),
            position,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Plus,
    Minus,
    Mul,
    IntDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    And,
    Or,
}

impl BinOp {
    pub fn from_token(kind: TokenKind) -> Option<BinOp> {
        Some(match kind {
            TokenKind::Plus => BinOp::Plus,
            TokenKind::Dash => BinOp::Minus,
            TokenKind::Star => BinOp::Mul,
            TokenKind::DoubleSlash => BinOp::IntDiv,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::Equals => BinOp::Eq,
            TokenKind::NotEquals => BinOp::Ne,
            TokenKind::Less => BinOp::Lt,
            TokenKind::LessEquals => BinOp::Le,
            TokenKind::Greater => BinOp::Gt,
            TokenKind::GreaterEquals => BinOp::Ge,
            TokenKind::Is => BinOp::Is,
            TokenKind::And => BinOp::And,
            TokenKind::Or => BinOp::Or,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Mul => "*",
            BinOp::IntDiv => "//",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Is => "is",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOp::Plus | BinOp::Minus | BinOp::Mul | BinOp::IntDiv | BinOp::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "not"),
        }
    }
}
