//! Type checking and name resolution.
//!
//! Turns the untyped AST into a typed AST while:
//!
//! - checking operand, argument, return and condition types
//! - resolving every name to a local, a global slot or an instance field
//! - enforcing where declarations may appear
//!
//! Function and class bodies are hoisted out of the top-level body so the
//! code generator can emit them as separate procedures.

pub mod type_checker;
pub mod typed_ast;
