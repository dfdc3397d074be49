#![allow(clippy::module_inception)]

use std::fmt::Display;

use crate::{
    compiler::compiler::{gen_program, Procedure},
    env::env::{augment_env, GlobalEnv},
    errors::errors::Error,
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::type_checker::type_check,
};

pub mod ast;
pub mod compiler;
pub mod env;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod type_checker;

extern crate regex;

/// Source location attached to every token and AST node.
///
/// `line` is 1-based, `col` is the 0-based byte column on that line and `len`
/// is the number of bytes the node spans on its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
    pub len: u32,
}

impl Position {
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Position { line, col, len }
    }

    /// Used for errors raised outside of any source text (runtime, internal).
    pub fn null() -> Self {
        Position::default()
    }

    pub fn is_null(&self) -> bool {
        self.line == 0
    }

    /// Span from the start of `self` to the end of `end`.
    ///
    /// Spans crossing a line break keep only their first line.
    pub fn to(&self, end: &Position) -> Position {
        if end.line == self.line && end.col + end.len >= self.col {
            Position::new(self.line, self.col, end.col + end.len - self.col)
        } else {
            *self
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col + 1)
    }
}

/// Output of one compilation turn.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Instructions for the snippet's top-level statements.
    pub main: Procedure,
    /// One procedure per function, method and constructor declared in the snippet.
    pub procedures: Vec<Procedure>,
    /// Environment to thread into the next turn.
    pub env: GlobalEnv,
    /// Static type of the trailing expression statement, if the snippet ends with one.
    pub result_type: Option<ast::types::Type>,
}

/// Compiles one snippet against `env`.
///
/// `env` is never modified; the extended environment is returned inside the
/// result, so a failed turn leaves the caller's environment untouched.
pub fn compile(source: &str, env: &GlobalEnv) -> Result<CompileResult, Error> {
    let tokens = tokenize(source)?;
    let ast = parse(tokens)?;

    let new_env = augment_env(env, &ast)?;
    let typed = type_check(&ast, &new_env)?;
    let (main, procedures) = gen_program(&typed, &new_env)?;

    Ok(CompileResult {
        main,
        procedures,
        env: new_env,
        result_type: typed.result_type,
    })
}
