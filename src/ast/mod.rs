/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: Shared pieces (names and operators)
/// - expressions: Expression nodes
/// - statements: Statement and declaration nodes
/// - types: Annotations and resolved static types
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
