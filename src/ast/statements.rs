use std::rc::Rc;

use crate::Position;

use super::{ast::Name, expressions::Expr, types::SymbolType};

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: Position,
}

impl Stmt {
    pub fn new(kind: StmtKind, position: Position) -> Self {
        Stmt { kind, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Pass,
    Expression(Expr),
    /// `name: T = value`
    Define(VarDecl),
    /// `target = value` where the target is an identifier or a member access
    Assign {
        target: Expr,
        value: Expr,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        branches: Vec<ElifBranch>,
        else_body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Function(Rc<FunctionDecl>),
    Class(Rc<ClassDecl>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Name,
    pub annotation: SymbolType,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Name,
    pub annotation: SymbolType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Name,
    pub params: Vec<Param>,
    /// `None` when no `->` annotation was written.
    pub return_type: Option<SymbolType>,
    pub body: Vec<Stmt>,
    pub position: Position,
}

/// Class bodies keep fields and methods apart; field order is declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Name,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub position: Position,
}
