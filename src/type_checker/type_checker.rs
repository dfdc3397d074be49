use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::{
        ast::{BinOp, UnaryOp},
        expressions::{Expr, ExprKind},
        statements::{ClassDecl, FunctionDecl, Stmt, StmtKind, VarDecl},
        types::Type,
    },
    env::env::{
        field_offset, first_define_offset, is_local, mangle, resolve_type, FuncSig, GlobalEnv,
        CONSTRUCTOR_NAME, WORD_SIZE,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::typed_ast::{
    TypedClass, TypedExpr, TypedExprKind, TypedFunction, TypedProgram, TypedStmt, TypedTarget,
    VariableScope,
};

/// Scope of the function or method whose body is being checked.
#[derive(Debug)]
pub struct Environment {
    /// Parameters and locals visible so far.
    pub variable_lookup: IndexMap<String, Type>,
    /// Locals declared in the body, in order.
    pub locals: Vec<String>,
    pub function: String,
    pub ret: Type,
    /// Enclosing class and receiver name, for methods.
    pub class: Option<(String, String)>,
}

impl Environment {
    pub fn declare_variable(
        &mut self,
        variable_name: &str,
        variable_type: Type,
        current_position: Position,
    ) -> Result<(), Error> {
        if is_local(&self.variable_lookup, variable_name) {
            return Err(Error::new(
                ErrorImpl::DuplicateDeclaration {
                    name: variable_name.to_string(),
                },
                current_position,
            ));
        }

        self.variable_lookup
            .insert(variable_name.to_string(), variable_type);
        self.locals.push(variable_name.to_string());
        Ok(())
    }
}

/// Where a statement sits; decides which declarations are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockKind {
    Module,
    Function,
    Nested,
}

#[derive(Debug)]
pub struct TypeChecker<'a> {
    pub env: &'a GlobalEnv,
    /// Globals visible at top level, with the slot each name is bound to at
    /// this point: those from earlier turns and the snippet's own defines
    /// already visited.
    pub checked_globals: HashMap<String, (Type, u32)>,
    pub environment: Option<Environment>,
    /// Slot of the next top-level define.
    next_define_offset: u32,
    functions: Vec<TypedFunction>,
    classes: Vec<TypedClass>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(env: &'a GlobalEnv, program: &[Stmt]) -> Self {
        let declared_here = program
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::Define(decl) => Some(decl.name.value.as_str()),
                _ => None,
            })
            .collect::<HashSet<_>>();

        TypeChecker {
            env,
            checked_globals: env
                .globals
                .iter()
                .filter(|(name, _)| !declared_here.contains(name.as_str()))
                .map(|(name, binding)| (name.clone(), binding.clone()))
                .collect(),
            environment: None,
            next_define_offset: first_define_offset(env, program),
            functions: vec![],
            classes: vec![],
        }
    }

    pub fn fetch_variable(
        &self,
        variable: &str,
        position: Position,
    ) -> Result<(Type, VariableScope), Error> {
        if let Some(environment) = &self.environment {
            if let Some(ty) = environment.variable_lookup.get(variable) {
                return Ok((ty.clone(), VariableScope::Local));
            }
        }

        // Bodies run after the whole snippet, so they see the latest bindings
        let global = match &self.environment {
            Some(_) => self.env.globals.get(variable),
            None => self.checked_globals.get(variable),
        };
        if let Some((ty, offset)) = global {
            return Ok((ty.clone(), VariableScope::Global(*offset)));
        }

        if let Some(Environment {
            class: Some((class, receiver)),
            ..
        }) = &self.environment
        {
            if let Some(layout) = self.env.classes.get(class) {
                if let Some((index, _, (_, ty))) = layout.members.get_full(variable) {
                    return Ok((
                        ty.clone(),
                        VariableScope::Member {
                            receiver: receiver.clone(),
                            offset: index as u32 * 8,
                        },
                    ));
                }
            }
        }

        Err(Error::new(
            ErrorImpl::VariableNotDeclared {
                variable: variable.to_string(),
            },
            position,
        ))
    }
}

fn class_of(expr: &TypedExpr, member: &str) -> Result<String, Error> {
    expr.ty.class_name().map(str::to_string).ok_or_else(|| {
        Error::new(
            ErrorImpl::NotAnObject {
                member: member.to_string(),
                received: expr.ty.to_string(),
            },
            expr.position,
        )
    })
}

fn operator_error(operator: BinOp, left: &TypedExpr, right: &TypedExpr, position: Position) -> Error {
    Error::new(
        ErrorImpl::OperatorTypeError {
            operator: operator.to_string(),
            left: left.ty.to_string(),
            right: right.ty.to_string(),
        },
        position,
    )
}

fn check_args(
    checker: &mut TypeChecker,
    function: &str,
    expected: &[Type],
    args: &[Expr],
    position: Position,
) -> Result<Vec<TypedExpr>, Error> {
    if args.len() != expected.len() {
        return Err(Error::new(
            ErrorImpl::ArgumentCountMismatch {
                function: function.to_string(),
                expected: expected.len(),
                received: args.len(),
            },
            position,
        ));
    }

    let mut typed_args = vec![];
    for (index, (arg, ty)) in args.iter().zip(expected).enumerate() {
        let typed = type_check_expr(checker, arg)?;
        if !ty.accepts(&typed.ty) {
            return Err(Error::new(
                ErrorImpl::ArgumentTypeMatchError {
                    index: index + 1,
                    expected: ty.to_string(),
                    received: typed.ty.to_string(),
                },
                arg.position,
            ));
        }
        typed_args.push(typed);
    }

    Ok(typed_args)
}

fn type_check_call(
    checker: &mut TypeChecker,
    callee: &Expr,
    args: &[Expr],
    position: Position,
) -> Result<TypedExpr, Error> {
    match &callee.kind {
        ExprKind::Identifier(name) => {
            if checker.env.classes.contains_key(name) {
                if !args.is_empty() {
                    return Err(Error::new(
                        ErrorImpl::ConstructorArguments {
                            class: name.clone(),
                            received: args.len(),
                        },
                        position,
                    ));
                }

                return Ok(TypedExpr::new(
                    TypedExprKind::Construct { class: name.clone() },
                    Type::Class(name.clone()),
                    position,
                ));
            }

            let sig: FuncSig = match checker.env.funcs.get(name) {
                Some(sig) => sig.clone(),
                None => {
                    let error = match checker.fetch_variable(name, callee.position) {
                        Ok((ty, _)) => ErrorImpl::NotCallable {
                            received: ty.to_string(),
                        },
                        Err(_) => ErrorImpl::FunctionNotInScope {
                            function: name.clone(),
                        },
                    };
                    return Err(Error::new(error, callee.position));
                }
            };

            // Builtins have no declaration
            if sig.decl.is_none() && (name == "print" || name == "len") {
                if args.len() != 1 {
                    return Err(Error::new(
                        ErrorImpl::ArgumentCountMismatch {
                            function: name.clone(),
                            expected: 1,
                            received: args.len(),
                        },
                        position,
                    ));
                }

                let arg = type_check_expr(checker, &args[0])?;
                if name == "print" {
                    return Ok(TypedExpr::new(
                        TypedExprKind::Print(Box::new(arg)),
                        Type::None,
                        position,
                    ));
                }

                if arg.ty != Type::Str {
                    return Err(Error::new(
                        ErrorImpl::ArgumentTypeMatchError {
                            index: 1,
                            expected: Type::Str.to_string(),
                            received: arg.ty.to_string(),
                        },
                        arg.position,
                    ));
                }
                return Ok(TypedExpr::new(
                    TypedExprKind::Len(Box::new(arg)),
                    Type::Int,
                    position,
                ));
            }

            let args = check_args(checker, name, &sig.param_types(), args, position)?;
            Ok(TypedExpr::new(
                TypedExprKind::Call {
                    function: name.clone(),
                    args,
                },
                sig.ret.clone(),
                position,
            ))
        }
        ExprKind::Member { object, member } => {
            let object = type_check_expr(checker, object)?;
            let class = class_of(&object, &member.value)?;

            let sig = checker
                .env
                .classes
                .get(&class)
                .and_then(|layout| layout.methods.get(&member.value))
                .cloned()
                .ok_or_else(|| {
                    Error::new(
                        ErrorImpl::MethodNotFound {
                            class: class.clone(),
                            method: member.value.clone(),
                        },
                        member.position,
                    )
                })?;

            // The receiver is implicit at the call site
            let expected = sig.param_types().into_iter().skip(1).collect::<Vec<_>>();
            let function = format!("{}.{}", class, member.value);
            let args = check_args(checker, &function, &expected, args, position)?;

            Ok(TypedExpr::new(
                TypedExprKind::MethodCall {
                    object: Box::new(object),
                    class,
                    method: member.value.clone(),
                    args,
                },
                sig.ret,
                position,
            ))
        }
        _ => {
            let callee = type_check_expr(checker, callee)?;
            Err(Error::new(
                ErrorImpl::NotCallable {
                    received: callee.ty.to_string(),
                },
                callee.position,
            ))
        }
    }
}

fn type_check_binary(
    checker: &mut TypeChecker,
    left: &Expr,
    operator: BinOp,
    right: &Expr,
    position: Position,
) -> Result<TypedExpr, Error> {
    let left = type_check_expr(checker, left)?;
    let right = type_check_expr(checker, right)?;

    let ty = match operator {
        _ if operator.is_arithmetic() => match (&left.ty, operator, &right.ty) {
            (Type::Int, _, Type::Int) => Type::Int,
            (Type::Str, BinOp::Plus, Type::Str) => Type::Str,
            (Type::Str, BinOp::Mul, Type::Int) => Type::Str,
            _ => return Err(operator_error(operator, &left, &right, position)),
        },
        BinOp::Eq | BinOp::Ne if left.ty == right.ty => Type::Bool,
        // Ordering compares the tagged words; strings only support equality
        _ if operator.is_comparison() && left.ty == right.ty && left.ty != Type::Str => {
            Type::Bool
        }
        BinOp::Is if left.ty.is_none_compatible() && right.ty == Type::None => Type::Bool,
        BinOp::And | BinOp::Or if left.ty == Type::Bool && right.ty == Type::Bool => Type::Bool,
        _ => return Err(operator_error(operator, &left, &right, position)),
    };

    Ok(TypedExpr::new(
        TypedExprKind::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        },
        ty,
        position,
    ))
}

fn expect_int(expr: TypedExpr, what: &str) -> Result<Box<TypedExpr>, Error> {
    if expr.ty != Type::Int {
        return Err(Error::new(
            ErrorImpl::OperatorTypeError {
                operator: what.to_string(),
                left: Type::Str.to_string(),
                right: expr.ty.to_string(),
            },
            expr.position,
        ));
    }
    Ok(Box::new(expr))
}

fn expect_str(expr: TypedExpr) -> Result<Box<TypedExpr>, Error> {
    if expr.ty != Type::Str {
        return Err(Error::new(
            ErrorImpl::NotIndexable {
                received: expr.ty.to_string(),
            },
            expr.position,
        ));
    }
    Ok(Box::new(expr))
}

pub fn type_check_expr(checker: &mut TypeChecker, expr: &Expr) -> Result<TypedExpr, Error> {
    let position = expr.position;

    let (kind, ty) = match &expr.kind {
        ExprKind::Number(value) => (TypedExprKind::Number(*value), Type::Int),
        ExprKind::Bool(value) => (TypedExprKind::Bool(*value), Type::Bool),
        ExprKind::None => (TypedExprKind::None, Type::None),
        ExprKind::Str(value) => (TypedExprKind::Str(value.clone()), Type::Str),
        ExprKind::Identifier(name) => {
            let (ty, scope) = checker.fetch_variable(name, position)?;
            (
                TypedExprKind::Variable {
                    name: name.clone(),
                    scope,
                },
                ty,
            )
        }
        ExprKind::Binary {
            left,
            operator,
            right,
        } => return type_check_binary(checker, left, *operator, right, position),
        ExprKind::Unary { operator, operand } => {
            let operand = type_check_expr(checker, operand)?;
            let expected = match operator {
                UnaryOp::Neg => Type::Int,
                UnaryOp::Not => Type::Bool,
            };

            if operand.ty != expected {
                return Err(Error::new(
                    ErrorImpl::UnaryOperatorTypeError {
                        operator: operator.to_string(),
                        operand: operand.ty.to_string(),
                    },
                    position,
                ));
            }

            (
                TypedExprKind::Unary {
                    operator: *operator,
                    operand: Box::new(operand),
                },
                expected,
            )
        }
        ExprKind::Call { callee, args } => return type_check_call(checker, callee, args, position),
        ExprKind::Member { object, member } => {
            let object = type_check_expr(checker, object)?;
            let class = class_of(&object, &member.value)?;
            let offset = field_offset(checker.env, &class, &member.value, member.position)?;
            let ty = checker.env.classes[&class].members[&member.value].1.clone();

            (
                TypedExprKind::Field {
                    object: Box::new(object),
                    offset,
                },
                ty,
            )
        }
        ExprKind::Index { object, index } => {
            let object = expect_str(type_check_expr(checker, object)?)?;
            let index = expect_int(type_check_expr(checker, index)?, "[]")?;

            (TypedExprKind::Index { object, index }, Type::Str)
        }
        ExprKind::Slice {
            object,
            start,
            stop,
            step,
        } => {
            let object = expect_str(type_check_expr(checker, object)?)?;
            let mut bound = |bound: &Option<Box<Expr>>| -> Result<Option<Box<TypedExpr>>, Error> {
                match bound {
                    Some(bound) => Ok(Some(expect_int(type_check_expr(checker, bound)?, "[:]")?)),
                    None => Ok(None),
                }
            };

            let start = bound(start)?;
            let stop = bound(stop)?;
            let step = bound(step)?;

            (
                TypedExprKind::Slice {
                    object,
                    start,
                    stop,
                    step,
                },
                Type::Str,
            )
        }
    };

    Ok(TypedExpr::new(kind, ty, position))
}

fn misplaced(construct: &str, position: Position) -> Error {
    Error::new(
        ErrorImpl::MisplacedDeclaration {
            construct: construct.to_string(),
        },
        position,
    )
}

fn type_check_block(
    checker: &mut TypeChecker,
    body: &[Stmt],
    kind: BlockKind,
) -> Result<Vec<TypedStmt>, Error> {
    let mut typed = vec![];
    for stmt in body {
        if let Some(stmt) = type_check_stmt(checker, stmt, kind)? {
            typed.push(stmt);
        }
    }
    Ok(typed)
}

fn type_check_condition(
    checker: &mut TypeChecker,
    condition: &Expr,
    construct: &str,
) -> Result<TypedExpr, Error> {
    let condition = type_check_expr(checker, condition)?;
    if condition.ty != Type::Bool {
        return Err(Error::new(
            ErrorImpl::ConditionTypeError {
                construct: construct.to_string(),
                received: condition.ty.to_string(),
            },
            condition.position,
        ));
    }
    Ok(condition)
}

fn type_check_define(
    checker: &mut TypeChecker,
    decl: &VarDecl,
    kind: BlockKind,
) -> Result<TypedStmt, Error> {
    let (ty, scope) = match kind {
        BlockKind::Module => {
            let ty = resolve_type(checker.env, &decl.annotation)?;
            let offset = checker.next_define_offset;
            checker.next_define_offset += WORD_SIZE;
            (ty, VariableScope::Global(offset))
        }
        BlockKind::Function => {
            let ty = resolve_type(checker.env, &decl.annotation)?;
            if ty == Type::None {
                return Err(Error::new(
                    ErrorImpl::NoneTypedVariable {
                        variable: decl.name.value.clone(),
                    },
                    decl.annotation.position,
                ));
            }
            (ty, VariableScope::Local)
        }
        BlockKind::Nested => return Err(misplaced("variable declaration", decl.name.position)),
    };

    let value = type_check_expr(checker, &decl.value)?;
    if !ty.accepts(&value.ty) {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                name: decl.name.value.clone(),
                expected: ty.to_string(),
                received: value.ty.to_string(),
            },
            decl.value.position,
        ));
    }

    match (checker.environment.as_mut(), &scope) {
        (Some(environment), _) if kind == BlockKind::Function => {
            environment.declare_variable(&decl.name.value, ty, decl.name.position)?
        }
        (_, VariableScope::Global(offset)) => {
            checker
                .checked_globals
                .insert(decl.name.value.clone(), (ty, *offset));
        }
        _ => return Err(Error::internal("define outside a function or module")),
    }

    Ok(TypedStmt::Define {
        name: decl.name.value.clone(),
        scope,
        value,
    })
}

fn type_check_assign(
    checker: &mut TypeChecker,
    target: &Expr,
    value: &Expr,
) -> Result<TypedStmt, Error> {
    let (name, ty, target) = match &target.kind {
        ExprKind::Identifier(name) => {
            let (ty, scope) = checker.fetch_variable(name, target.position)?;
            (
                name.clone(),
                ty,
                TypedTarget::Variable {
                    name: name.clone(),
                    scope,
                },
            )
        }
        ExprKind::Member { object, member } => {
            let object = type_check_expr(checker, object)?;
            let class = class_of(&object, &member.value)?;
            let offset = field_offset(checker.env, &class, &member.value, member.position)?;
            let ty = checker.env.classes[&class].members[&member.value].1.clone();

            (member.value.clone(), ty, TypedTarget::Field { object, offset })
        }
        _ => {
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: String::from("="),
                    message: String::from("can only assign to a variable or a member"),
                },
                target.position,
            ))
        }
    };

    let value = type_check_expr(checker, value)?;
    if !ty.accepts(&value.ty) {
        return Err(Error::new(
            ErrorImpl::TypeMatchError {
                name,
                expected: ty.to_string(),
                received: value.ty.to_string(),
            },
            value.position,
        ));
    }

    Ok(TypedStmt::Assign { target, value })
}

/// Checks one statement. Function and class declarations are hoisted into
/// the checker and produce no statement.
fn type_check_stmt(
    checker: &mut TypeChecker,
    stmt: &Stmt,
    kind: BlockKind,
) -> Result<Option<TypedStmt>, Error> {
    let typed = match &stmt.kind {
        StmtKind::Pass => TypedStmt::Pass,
        StmtKind::Expression(expr) => TypedStmt::Expression(type_check_expr(checker, expr)?),
        StmtKind::Define(decl) => type_check_define(checker, decl, kind)?,
        StmtKind::Assign { target, value } => type_check_assign(checker, target, value)?,
        StmtKind::While { condition, body } => {
            let condition = type_check_condition(checker, condition, "while")?;
            let body = type_check_block(checker, body, BlockKind::Nested)?;
            TypedStmt::While { condition, body }
        }
        StmtKind::If {
            condition,
            then_body,
            branches,
            else_body,
        } => {
            let condition = type_check_condition(checker, condition, "if")?;
            let then_body = type_check_block(checker, then_body, BlockKind::Nested)?;

            let mut typed_branches = vec![];
            for branch in branches {
                let condition = type_check_condition(checker, &branch.condition, "elif")?;
                let body = type_check_block(checker, &branch.body, BlockKind::Nested)?;
                typed_branches.push((condition, body));
            }

            let else_body = type_check_block(checker, else_body, BlockKind::Nested)?;
            TypedStmt::If {
                condition,
                then_body,
                branches: typed_branches,
                else_body,
            }
        }
        StmtKind::Return(value) => {
            let (function, expected) = match &checker.environment {
                Some(environment) => (environment.function.clone(), environment.ret.clone()),
                None => {
                    return Err(Error::new(
                        ErrorImpl::ReturnOutsideFunction,
                        stmt.position,
                    ))
                }
            };

            let value = value
                .as_ref()
                .map(|value| type_check_expr(checker, value))
                .transpose()?;
            let received = value.as_ref().map(|value| value.ty.clone()).unwrap_or(Type::None);

            if !expected.accepts(&received) {
                return Err(Error::new(
                    ErrorImpl::ReturnTypeMismatch {
                        function,
                        expected: expected.to_string(),
                        received: received.to_string(),
                    },
                    stmt.position,
                ));
            }

            TypedStmt::Return(value)
        }
        StmtKind::Function(decl) => {
            if kind != BlockKind::Module {
                return Err(misplaced("nested function", decl.name.position));
            }

            let sig = checker.env.funcs.get(&decl.name.value).cloned().ok_or_else(|| {
                Error::internal(format!("function `{}` was not registered", decl.name.value))
            })?;
            let function = type_check_function(checker, decl, &sig, None, decl.name.value.clone())?;
            checker.functions.push(function);
            return Ok(None);
        }
        StmtKind::Class(decl) => {
            if kind != BlockKind::Module {
                return Err(misplaced("nested class", decl.name.position));
            }

            let class = type_check_class(checker, decl)?;
            checker.classes.push(class);
            return Ok(None);
        }
    };

    Ok(Some(typed))
}

/// Whether every path through `body` ends in a `return`.
fn always_returns(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If {
            then_body,
            branches,
            else_body,
            ..
        } => {
            always_returns(then_body)
                && branches.iter().all(|branch| always_returns(&branch.body))
                && always_returns(else_body)
        }
        _ => false,
    })
}

fn type_check_function(
    checker: &mut TypeChecker,
    decl: &FunctionDecl,
    sig: &FuncSig,
    class: Option<&str>,
    name: String,
) -> Result<TypedFunction, Error> {
    let receiver = class.and_then(|_| sig.params.first().map(|(name, _)| name.clone()));

    checker.environment = Some(Environment {
        variable_lookup: sig.params.iter().cloned().collect(),
        locals: vec![],
        function: decl.name.value.clone(),
        ret: sig.ret.clone(),
        class: class
            .map(str::to_string)
            .zip(receiver.clone()),
    });

    let body = type_check_block(checker, &decl.body, BlockKind::Function);
    let environment = checker.environment.take();
    let body = body?;

    if sig.ret != Type::None && !always_returns(&decl.body) {
        return Err(Error::new(
            ErrorImpl::MissingReturn {
                function: decl.name.value.clone(),
                expected: sig.ret.to_string(),
            },
            decl.name.position,
        ));
    }

    Ok(TypedFunction {
        name,
        params: sig.params.iter().map(|(name, _)| name.clone()).collect(),
        locals: environment.map(|env| env.locals).unwrap_or_default(),
        receiver,
        body,
        ret: sig.ret.clone(),
    })
}

fn type_check_class(checker: &mut TypeChecker, decl: &ClassDecl) -> Result<TypedClass, Error> {
    let name = decl.name.value.clone();
    let layout = checker.env.classes.get(&name).cloned().ok_or_else(|| {
        Error::internal(format!("class `{}` was not registered", name))
    })?;

    // Defaults see the same names as the top level at the declaration
    let mut fields = vec![];
    for field in &decl.fields {
        let value = type_check_expr(checker, &field.value)?;
        let (index, _, (_, ty)) = layout
            .members
            .get_full(&field.name.value)
            .ok_or_else(|| {
                Error::internal(format!("field `{}` was not registered", field.name.value))
            })?;
        if !ty.accepts(&value.ty) {
            return Err(Error::new(
                ErrorImpl::TypeMatchError {
                    name: field.name.value.clone(),
                    expected: ty.to_string(),
                    received: value.ty.to_string(),
                },
                field.value.position,
            ));
        }
        fields.push((index as u32 * WORD_SIZE, value));
    }

    let ctor_name = mangle(&name, CONSTRUCTOR_NAME);
    let ctor = match &layout.ctor.decl {
        Some(ctor) => type_check_function(checker, ctor, &layout.ctor, Some(&name), ctor_name)?,
        None => TypedFunction {
            name: ctor_name,
            params: vec![String::from("self")],
            locals: vec![],
            receiver: Some(String::from("self")),
            body: vec![],
            ret: Type::None,
        },
    };

    let mut methods = vec![];
    for (method, sig) in &layout.methods {
        let method_decl = sig.decl.as_ref().ok_or_else(|| {
            Error::internal(format!("method `{}` of `{}` has no body", method, name))
        })?;
        methods.push(type_check_function(
            checker,
            method_decl,
            sig,
            Some(&name),
            mangle(&name, method),
        )?);
    }

    Ok(TypedClass {
        name,
        table_id: layout.table_id,
        fields,
        ctor,
        methods,
    })
}

/// Type checks a snippet against its augmented environment.
///
/// Fails on the first violation. Function and class bodies are checked
/// where they are declared and hoisted into the returned program.
pub fn type_check(program: &[Stmt], env: &GlobalEnv) -> Result<TypedProgram, Error> {
    let mut checker = TypeChecker::new(env, program);
    let body = type_check_block(&mut checker, program, BlockKind::Module)?;

    let result_type = match program.last().map(|stmt| &stmt.kind) {
        Some(StmtKind::Expression(_)) => match body.last() {
            Some(TypedStmt::Expression(expr)) => Some(expr.ty.clone()),
            _ => None,
        },
        _ => None,
    };

    debug!(
        statements = body.len(),
        functions = checker.functions.len(),
        classes = checker.classes.len(),
        "type checked program"
    );

    Ok(TypedProgram {
        body,
        functions: checker.functions,
        classes: checker.classes,
        result_type,
    })
}
