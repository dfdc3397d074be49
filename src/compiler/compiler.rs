//! Main code generation module.
//!
//! Holds the `Compiler` state used while lowering one procedure, the
//! `Procedure` it produces, and `gen_program`, which lowers a whole typed
//! snippet: one procedure per function, method and constructor plus the
//! main procedure for the top-level statements.

use tracing::debug;

use crate::{
    env::env::GlobalEnv,
    errors::errors::Error,
    runtime::value::{NONE, POINTER_TAG},
    type_checker::typed_ast::{TypedClass, TypedExpr, TypedFunction, TypedProgram},
};

use super::{
    expr::gen_expression,
    instructions::{render_all, Instr},
    stmt::gen_statement,
};

/// Name of the procedure holding a snippet's top-level statements.
pub const MAIN_NAME: &str = "$main";
/// Export name of the main procedure, the host's entry point.
pub const EXPORT_NAME: &str = "exported_func";
/// Local of the main procedure holding the last expression statement's value.
pub const RESULT_LOCAL: &str = "$last";

/// A lowered function. Every parameter, local and result is an i64 word.
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub params: Vec<String>,
    pub locals: Vec<String>,
    pub body: Vec<Instr>,
    pub export: Option<String>,
}

impl Procedure {
    /// Renders the procedure as a WebAssembly text `func`.
    pub fn to_wat(&self) -> String {
        let mut header = format!("(func ${}", self.name);
        if let Some(export) = &self.export {
            header.push_str(&format!(" (export \"{}\")", export));
        }
        for param in &self.params {
            header.push_str(&format!(" (param ${} i64)", param));
        }
        header.push_str(" (result i64)");

        let mut lines = vec![header];
        for local in &self.locals {
            lines.push(format!("  (local ${} i64)", local));
        }
        render_all(&self.body, 1, &mut lines);
        lines.push(String::from(")"));

        lines.join("\n")
    }
}

/// Code generation state for the procedure being lowered.
///
/// # Fields
///
/// * `env` - The augmented environment of the snippet, for class layouts
/// * `temps` - Scratch locals allocated so far in the current procedure
/// * `at_top_level` - Whether the main procedure is being generated
pub struct Compiler<'a> {
    pub env: &'a GlobalEnv,
    pub temps: Vec<String>,
    pub at_top_level: bool,
}

impl<'a> Compiler<'a> {
    pub fn new(env: &'a GlobalEnv) -> Self {
        Compiler {
            env,
            temps: vec![],
            at_top_level: false,
        }
    }

    /// Allocates a scratch local named `$<kind><n>`.
    ///
    /// Temp names start with `$`, which no user identifier can, so they
    /// never shadow a variable.
    pub fn fresh_temp(&mut self, kind: &str) -> String {
        let name = format!("${}{}", kind, self.temps.len());
        self.temps.push(name.clone());
        name
    }

    fn begin_procedure(&mut self, at_top_level: bool) {
        self.temps.clear();
        self.at_top_level = at_top_level;
    }
}

/// Lowers a function, method or constructor.
///
/// Methods and constructors receive their receiver as a raw address and
/// re-tag it on entry, so inside the body `self` is an ordinary pointer.
/// Every path that falls off the end returns `None`.
pub fn gen_function(compiler: &mut Compiler, function: &TypedFunction) -> Result<Procedure, Error> {
    gen_procedure(compiler, function, &[])
}

/// Lowers a class's constructor. The field defaults are stored through the
/// raw receiver before the `__init__` body runs.
pub fn gen_constructor(compiler: &mut Compiler, class: &TypedClass) -> Result<Procedure, Error> {
    gen_procedure(compiler, &class.ctor, &class.fields)
}

fn gen_procedure(
    compiler: &mut Compiler,
    function: &TypedFunction,
    fields: &[(u32, TypedExpr)],
) -> Result<Procedure, Error> {
    compiler.begin_procedure(false);
    let mut body = vec![];

    if let Some(receiver) = &function.receiver {
        for (offset, default) in fields {
            body.extend([Instr::LocalGet(receiver.clone()), Instr::I32WrapI64]);
            gen_expression(compiler, default, &mut body)?;
            body.push(Instr::I64Store { offset: *offset });
        }

        body.extend([
            Instr::LocalGet(receiver.clone()),
            Instr::I64Const(POINTER_TAG),
            Instr::I64Add,
            Instr::LocalSet(receiver.clone()),
        ]);
    }

    for stmt in &function.body {
        gen_statement(compiler, stmt, &mut body)?;
    }
    body.push(Instr::I64Const(NONE));

    let mut locals = function.locals.clone();
    locals.append(&mut compiler.temps);

    Ok(Procedure {
        name: function.name.clone(),
        params: function.params.clone(),
        locals,
        body,
        export: None,
    })
}

/// Lowers a typed snippet.
///
/// Returns the main procedure, exported as `exported_func`, and the
/// procedures declared by the snippet: free functions first, then each
/// class's constructor followed by its methods.
pub fn gen_program(
    program: &TypedProgram,
    env: &GlobalEnv,
) -> Result<(Procedure, Vec<Procedure>), Error> {
    let mut compiler = Compiler::new(env);
    let mut procedures = vec![];

    for function in &program.functions {
        procedures.push(gen_function(&mut compiler, function)?);
    }

    for class in &program.classes {
        procedures.push(gen_constructor(&mut compiler, class)?);
        for method in &class.methods {
            procedures.push(gen_function(&mut compiler, method)?);
        }
    }

    compiler.begin_procedure(true);
    let mut body = vec![
        Instr::I64Const(NONE),
        Instr::LocalSet(RESULT_LOCAL.to_string()),
    ];

    for stmt in &program.body {
        gen_statement(&mut compiler, stmt, &mut body)?;
    }
    body.push(Instr::LocalGet(RESULT_LOCAL.to_string()));

    let mut locals = vec![RESULT_LOCAL.to_string()];
    locals.append(&mut compiler.temps);

    let main = Procedure {
        name: MAIN_NAME.to_string(),
        params: vec![],
        locals,
        body,
        export: Some(EXPORT_NAME.to_string()),
    };

    debug!(
        procedures = procedures.len(),
        instructions = main.body.len(),
        "generated program"
    );

    Ok((main, procedures))
}
