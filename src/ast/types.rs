//! Type definitions for the AST.
//!
//! This module defines:
//!
//! - `SymbolType`, a type annotation exactly as written in the source
//! - `Type`, the resolved static type used by the type checker and the
//!   code generator
//!
//! Annotations are resolved into types against the global environment,
//! since class names are only known once the environment is augmented.

use std::fmt::Display;

use crate::Position;

/// A type annotation as written, e.g. `int` or `Point`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolType {
    pub name: String,
    pub position: Position,
}

impl SymbolType {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        SymbolType {
            name: name.into(),
            position,
        }
    }
}

/// Static types. Class types compare by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Bool,
    None,
    Str,
    Class(String),
}

impl Type {
    /// Whether a slot of this type may hold `None`.
    pub fn is_none_compatible(&self) -> bool {
        matches!(self, Type::None | Type::Class(_))
    }

    /// Whether a value of type `other` may be stored in a slot of this type.
    pub fn accepts(&self, other: &Type) -> bool {
        self == other || (*other == Type::None && self.is_none_compatible())
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::None => write!(f, "None"),
            Type::Str => write!(f, "str"),
            Type::Class(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Type;

    #[test]
    fn test_none_compatibility() {
        assert!(Type::Class("A".to_string()).accepts(&Type::None));
        assert!(Type::None.accepts(&Type::None));
        assert!(!Type::Int.accepts(&Type::None));
        assert!(!Type::Str.accepts(&Type::None));
        assert!(!Type::Class("A".to_string()).accepts(&Type::Class("B".to_string())));
        assert!(Type::Class("A".to_string()).accepts(&Type::Class("A".to_string())));
    }
}
