//! Typed AST produced by the type checker.
//!
//! Every expression carries its static type, and every name is resolved to
//! where it lives (local, global slot or instance field), so the code
//! generator never consults scopes again.

use crate::{
    ast::{
        ast::{BinOp, UnaryOp},
        types::Type,
    },
    Position,
};

/// Where a variable lives.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableScope {
    Local,
    /// Byte offset of the global slot.
    Global(u32),
    /// Implicit `self.<name>` inside a method; `receiver` is the name of the
    /// method's first parameter.
    Member { receiver: String, offset: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Type,
    pub position: Position,
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: Type, position: Position) -> Self {
        TypedExpr { kind, ty, position }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Number(i64),
    Bool(bool),
    None,
    Str(String),
    Variable {
        name: String,
        scope: VariableScope,
    },
    Binary {
        left: Box<TypedExpr>,
        operator: BinOp,
        right: Box<TypedExpr>,
    },
    Unary {
        operator: UnaryOp,
        operand: Box<TypedExpr>,
    },
    /// Call of a free function.
    Call {
        function: String,
        args: Vec<TypedExpr>,
    },
    Print(Box<TypedExpr>),
    Len(Box<TypedExpr>),
    Construct {
        class: String,
    },
    MethodCall {
        object: Box<TypedExpr>,
        class: String,
        method: String,
        args: Vec<TypedExpr>,
    },
    Field {
        object: Box<TypedExpr>,
        offset: u32,
    },
    Index {
        object: Box<TypedExpr>,
        index: Box<TypedExpr>,
    },
    Slice {
        object: Box<TypedExpr>,
        start: Option<Box<TypedExpr>>,
        stop: Option<Box<TypedExpr>>,
        step: Option<Box<TypedExpr>>,
    },
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedTarget {
    Variable { name: String, scope: VariableScope },
    Field { object: TypedExpr, offset: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    Pass,
    Expression(TypedExpr),
    Define {
        name: String,
        scope: VariableScope,
        value: TypedExpr,
    },
    Assign {
        target: TypedTarget,
        value: TypedExpr,
    },
    While {
        condition: TypedExpr,
        body: Vec<TypedStmt>,
    },
    If {
        condition: TypedExpr,
        then_body: Vec<TypedStmt>,
        branches: Vec<(TypedExpr, Vec<TypedStmt>)>,
        else_body: Vec<TypedStmt>,
    },
    Return(Option<TypedExpr>),
}

/// A free function, method or constructor ready for code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedFunction {
    /// Procedure name; `Class$method` for methods.
    pub name: String,
    pub params: Vec<String>,
    /// Locals declared in the body, in declaration order.
    pub locals: Vec<String>,
    /// Receiver parameter, re-tagged on entry. Set for methods and constructors.
    pub receiver: Option<String>,
    pub body: Vec<TypedStmt>,
    pub ret: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedClass {
    pub name: String,
    pub table_id: u32,
    /// Byte offset and default value of every field, in declaration order.
    pub fields: Vec<(u32, TypedExpr)>,
    pub ctor: TypedFunction,
    pub methods: Vec<TypedFunction>,
}

/// A type-checked snippet. Declarations are hoisted out of the top-level body.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedProgram {
    pub body: Vec<TypedStmt>,
    pub functions: Vec<TypedFunction>,
    pub classes: Vec<TypedClass>,
    /// Type of the trailing expression statement, if the snippet ends with one.
    pub result_type: Option<Type>,
}
