use crate::{
    ast::{
        ast::{BinOp, UnaryOp},
        types::Type,
    },
    env::env::{mangle, CONSTRUCTOR_NAME},
    errors::errors::Error,
    runtime::{
        host::{SLICE_INDEX, SLICE_RANGE},
        value::{FALSE, NONE, POINTER_TAG, STRING_TAG, TRUE},
    },
    type_checker::typed_ast::{TypedExpr, TypedExprKind, VariableScope},
};

use super::{compiler::Compiler, instructions::Instr, stdlib::runtime_name};

/// Re-tags an i32 comparison result as a bool word.
fn to_bool_word(out: &mut Vec<Instr>) {
    out.extend([
        Instr::I64ExtendI32U,
        Instr::I64Const(FALSE),
        Instr::I64Add,
    ]);
}

/// Turns the tagged pointer on the stack into a raw i64 address, trapping on `None`.
pub fn gen_untag_object(out: &mut Vec<Instr>) {
    out.extend([
        Instr::Call(runtime_name("assert_non_none")),
        Instr::I64Const(POINTER_TAG),
        Instr::I64Sub,
    ]);
}

/// Pushes the i32 address of a variable's storage, for variables that live
/// in memory. Locals have no address and push nothing.
pub fn gen_variable_address(scope: &VariableScope, out: &mut Vec<Instr>) -> u32 {
    match scope {
        VariableScope::Local => 0,
        VariableScope::Global(offset) => {
            out.push(Instr::I32Const(*offset as i32));
            0
        }
        VariableScope::Member { receiver, offset } => {
            out.extend([
                Instr::LocalGet(receiver.clone()),
                Instr::I64Const(POINTER_TAG),
                Instr::I64Sub,
                Instr::I32WrapI64,
            ]);
            *offset
        }
    }
}

fn gen_string_literal(compiler: &mut Compiler, value: &str, out: &mut Vec<Instr>) {
    let bytes = value.as_bytes();
    let temp = compiler.fresh_temp("str");

    out.extend([
        Instr::I64Const(bytes.len() as i64 + 1),
        Instr::Call(runtime_name("malloc")),
        Instr::LocalSet(temp.clone()),
    ]);

    // Memory starts zeroed, but the terminator is stored anyway
    for (offset, byte) in bytes.iter().chain(std::iter::once(&0)).enumerate() {
        out.extend([
            Instr::LocalGet(temp.clone()),
            Instr::I32WrapI64,
            Instr::I32Const(*byte as i32),
            Instr::I32Store8 {
                offset: offset as u32,
            },
        ]);
    }

    out.extend([
        Instr::LocalGet(temp),
        Instr::I64Const(STRING_TAG),
        Instr::I64Add,
    ]);
}

/// Allocates an instance, runs the constructor on the raw base address,
/// which stores the field defaults, and leaves the tagged pointer on the
/// stack.
fn gen_construct(compiler: &mut Compiler, class: &str, out: &mut Vec<Instr>) -> Result<(), Error> {
    let env = compiler.env;
    let layout = env
        .classes
        .get(class)
        .ok_or_else(|| Error::internal(format!("class `{}` has no layout", class)))?;
    let base = compiler.fresh_temp("obj");

    out.extend([
        Instr::I64Const(layout.size() as i64),
        Instr::Call(runtime_name("malloc")),
        Instr::LocalSet(base.clone()),
    ]);

    out.extend([
        Instr::LocalGet(base.clone()),
        Instr::Call(mangle(class, CONSTRUCTOR_NAME)),
        Instr::Drop,
        Instr::LocalGet(base),
        Instr::I64Const(POINTER_TAG),
        Instr::I64Add,
    ]);

    Ok(())
}

fn gen_print(compiler: &mut Compiler, arg: &TypedExpr, out: &mut Vec<Instr>) -> Result<(), Error> {
    gen_expression(compiler, arg, out)?;

    match &arg.ty {
        // The host dispatches on the runtime tag
        Type::Int | Type::Bool | Type::Str | Type::None => {
            out.push(Instr::Call(runtime_name("print")))
        }
        Type::Class(class) => {
            let env = compiler.env;
            let table_id = env
                .classes
                .get(class)
                .map(|layout| layout.table_id)
                .ok_or_else(|| Error::internal(format!("class `{}` has no layout", class)))?;
            let temp = compiler.fresh_temp("obj");

            // A class-typed slot may still hold None
            out.extend([
                Instr::LocalSet(temp.clone()),
                Instr::LocalGet(temp.clone()),
                Instr::I64Const(NONE),
                Instr::I64Eq,
                Instr::If {
                    result: true,
                    then: vec![Instr::Call(runtime_name("print_none"))],
                    otherwise: vec![
                        Instr::LocalGet(temp),
                        Instr::I64Const(POINTER_TAG),
                        Instr::I64Sub,
                        Instr::I64Const(table_id as i64),
                        Instr::Call(runtime_name("print_obj")),
                    ],
                },
            ]);
        }
    }

    Ok(())
}

fn gen_binary(
    compiler: &mut Compiler,
    left: &TypedExpr,
    operator: BinOp,
    right: &TypedExpr,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    gen_expression(compiler, left, out)?;

    // Short-circuit: the right operand only runs when it decides the result
    if let BinOp::And | BinOp::Or = operator {
        let mut rest = vec![];
        gen_expression(compiler, right, &mut rest)?;

        let (then, otherwise) = match operator {
            BinOp::And => (rest, vec![Instr::I64Const(FALSE)]),
            _ => (vec![Instr::I64Const(TRUE)], rest),
        };

        out.extend([
            Instr::I32WrapI64,
            Instr::If {
                result: true,
                then,
                otherwise,
            },
        ]);
        return Ok(());
    }

    gen_expression(compiler, right, out)?;

    if left.ty == Type::Str {
        let import = match operator {
            BinOp::Plus => "str_concat",
            BinOp::Mul => "str_mult",
            BinOp::Eq => "str_eq",
            BinOp::Ne => "str_neq",
            _ => return Err(Error::internal(format!("no string operator `{}`", operator))),
        };
        out.push(Instr::Call(runtime_name(import)));
        return Ok(());
    }

    let instr = match operator {
        BinOp::Plus => Instr::I64Add,
        BinOp::Minus => Instr::I64Sub,
        BinOp::Mul => Instr::I64Mul,
        BinOp::IntDiv => Instr::I64DivS,
        BinOp::Mod => Instr::I64RemS,
        BinOp::Eq | BinOp::Is => Instr::I64Eq,
        BinOp::Ne => Instr::I64Ne,
        BinOp::Lt => Instr::I64LtS,
        BinOp::Le => Instr::I64LeS,
        BinOp::Gt => Instr::I64GtS,
        BinOp::Ge => Instr::I64GeS,
        BinOp::And | BinOp::Or => {
            return Err(Error::internal("logical operator reached arithmetic lowering"))
        }
    };
    out.push(instr);

    if operator.is_comparison() || operator == BinOp::Is {
        to_bool_word(out);
    }

    Ok(())
}

fn gen_optional(
    compiler: &mut Compiler,
    expr: &Option<Box<TypedExpr>>,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    match expr {
        Some(expr) => gen_expression(compiler, expr, out),
        None => {
            out.push(Instr::I64Const(NONE));
            Ok(())
        }
    }
}

/// Appends the instructions computing `expression`, leaving exactly one
/// i64 word on the stack.
pub fn gen_expression(
    compiler: &mut Compiler,
    expression: &TypedExpr,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    match &expression.kind {
        TypedExprKind::Number(value) => out.push(Instr::I64Const(*value)),
        TypedExprKind::Bool(value) => out.push(Instr::I64Const(if *value { TRUE } else { FALSE })),
        TypedExprKind::None => out.push(Instr::I64Const(NONE)),
        TypedExprKind::Str(value) => gen_string_literal(compiler, value, out),
        TypedExprKind::Variable { name, scope } => match scope {
            VariableScope::Local => out.push(Instr::LocalGet(name.clone())),
            _ => {
                let offset = gen_variable_address(scope, out);
                out.push(Instr::I64Load { offset });
            }
        },
        TypedExprKind::Binary {
            left,
            operator,
            right,
        } => gen_binary(compiler, left, *operator, right, out)?,
        TypedExprKind::Unary { operator, operand } => match operator {
            UnaryOp::Neg => {
                out.push(Instr::I64Const(0));
                gen_expression(compiler, operand, out)?;
                out.push(Instr::I64Sub);
            }
            UnaryOp::Not => {
                // TRUE and FALSE differ only in the lowest bit
                gen_expression(compiler, operand, out)?;
                out.extend([Instr::I64Const(1), Instr::I64Xor]);
            }
        },
        TypedExprKind::Call { function, args } => {
            for arg in args {
                gen_expression(compiler, arg, out)?;
            }
            out.push(Instr::Call(function.clone()));
        }
        TypedExprKind::Print(arg) => gen_print(compiler, arg, out)?,
        TypedExprKind::Len(arg) => {
            gen_expression(compiler, arg, out)?;
            out.push(Instr::Call(runtime_name("str_len")));
        }
        TypedExprKind::Construct { class } => gen_construct(compiler, class, out)?,
        TypedExprKind::MethodCall {
            object,
            class,
            method,
            args,
        } => {
            gen_expression(compiler, object, out)?;
            gen_untag_object(out);
            for arg in args {
                gen_expression(compiler, arg, out)?;
            }
            out.push(Instr::Call(mangle(class, method)));
        }
        TypedExprKind::Field { object, offset } => {
            gen_expression(compiler, object, out)?;
            gen_untag_object(out);
            out.extend([Instr::I32WrapI64, Instr::I64Load { offset: *offset }]);
        }
        TypedExprKind::Index { object, index } => {
            gen_expression(compiler, object, out)?;
            gen_expression(compiler, index, out)?;
            out.extend([
                Instr::I64Const(NONE),
                Instr::I64Const(NONE),
                Instr::I64Const(SLICE_INDEX),
                Instr::Call(runtime_name("str_slice")),
            ]);
        }
        TypedExprKind::Slice {
            object,
            start,
            stop,
            step,
        } => {
            gen_expression(compiler, object, out)?;
            gen_optional(compiler, start, out)?;
            gen_optional(compiler, stop, out)?;
            gen_optional(compiler, step, out)?;
            out.extend([
                Instr::I64Const(SLICE_RANGE),
                Instr::Call(runtime_name("str_slice")),
            ]);
        }
    }

    Ok(())
}
