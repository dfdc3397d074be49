//! Code generation module for the compiler.
//!
//! Lowers the typed AST to procedures of stack machine instructions. It
//! handles:
//!
//! - Lowering of expressions and statements
//! - Tagging of values and memory layout of globals and objects
//! - Runtime imports and WebAssembly text output
//! - Procedures for functions, methods and constructors

pub mod compiler;
pub mod expr;
pub mod instructions;
pub mod stdlib;
pub mod stmt;

#[cfg(test)]
mod tests;
