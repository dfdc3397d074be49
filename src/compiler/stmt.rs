use crate::{
    errors::errors::Error,
    runtime::value::NONE,
    type_checker::typed_ast::{TypedExpr, TypedStmt, TypedTarget, VariableScope},
};

use super::{
    compiler::{Compiler, RESULT_LOCAL},
    expr::{gen_expression, gen_untag_object, gen_variable_address},
    instructions::Instr,
};

fn gen_block(compiler: &mut Compiler, body: &[TypedStmt]) -> Result<Vec<Instr>, Error> {
    let mut out = vec![];
    for stmt in body {
        gen_statement(compiler, stmt, &mut out)?;
    }
    Ok(out)
}

/// Pops the i64 condition and leaves an i32 for `if`/`br_if`.
fn gen_condition(
    compiler: &mut Compiler,
    condition: &TypedExpr,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    gen_expression(compiler, condition, out)?;
    out.push(Instr::I32WrapI64);
    Ok(())
}

fn gen_store(
    compiler: &mut Compiler,
    name: &str,
    scope: &VariableScope,
    value: &TypedExpr,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    if let VariableScope::Local = scope {
        gen_expression(compiler, value, out)?;
        out.push(Instr::LocalSet(name.to_string()));
        return Ok(());
    }

    let offset = gen_variable_address(scope, out);
    gen_expression(compiler, value, out)?;
    out.push(Instr::I64Store { offset });
    Ok(())
}

/// `if`/`elif`/`else` chains lower to nested ifs, one per condition.
fn gen_if_chain(
    compiler: &mut Compiler,
    branches: &[(&TypedExpr, &[TypedStmt])],
    else_body: &[TypedStmt],
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    let Some(((condition, body), rest)) = branches.split_first() else {
        out.extend(gen_block(compiler, else_body)?);
        return Ok(());
    };

    gen_condition(compiler, condition, out)?;
    let then = gen_block(compiler, body)?;
    let mut otherwise = vec![];
    gen_if_chain(compiler, rest, else_body, &mut otherwise)?;

    out.push(Instr::If {
        result: false,
        then,
        otherwise,
    });
    Ok(())
}

/// Appends the instructions for `statement`. Statements leave the stack
/// as they found it.
pub fn gen_statement(
    compiler: &mut Compiler,
    statement: &TypedStmt,
    out: &mut Vec<Instr>,
) -> Result<(), Error> {
    match statement {
        TypedStmt::Pass => {}
        TypedStmt::Expression(expr) => {
            gen_expression(compiler, expr, out)?;
            if compiler.at_top_level {
                out.push(Instr::LocalSet(RESULT_LOCAL.to_string()));
            } else {
                out.push(Instr::Drop);
            }
        }
        TypedStmt::Define { name, scope, value } => gen_store(compiler, name, scope, value, out)?,
        TypedStmt::Assign { target, value } => match target {
            TypedTarget::Variable { name, scope } => gen_store(compiler, name, scope, value, out)?,
            TypedTarget::Field { object, offset } => {
                gen_expression(compiler, object, out)?;
                gen_untag_object(out);
                out.push(Instr::I32WrapI64);
                gen_expression(compiler, value, out)?;
                out.push(Instr::I64Store { offset: *offset });
            }
        },
        TypedStmt::While { condition, body } => {
            let mut looped = vec![];
            gen_condition(compiler, condition, &mut looped)?;
            looped.extend([Instr::I32Eqz, Instr::BrIf(1)]);
            looped.extend(gen_block(compiler, body)?);
            looped.push(Instr::Br(0));

            out.push(Instr::Block(vec![Instr::Loop(looped)]));
        }
        TypedStmt::If {
            condition,
            then_body,
            branches,
            else_body,
        } => {
            let mut chain = vec![(condition, then_body.as_slice())];
            chain.extend(branches.iter().map(|(condition, body)| (condition, body.as_slice())));
            gen_if_chain(compiler, &chain, else_body, out)?;
        }
        TypedStmt::Return(value) => {
            match value {
                Some(value) => gen_expression(compiler, value, out)?,
                None => out.push(Instr::I64Const(NONE)),
            }
            out.push(Instr::Return);
        }
    }

    Ok(())
}
