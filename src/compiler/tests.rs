use pretty_assertions::assert_eq;

use super::{
    compiler::{Procedure, EXPORT_NAME, RESULT_LOCAL},
    instructions::Instr,
    stdlib::{emit_module, lookup_import, runtime_name},
};
use crate::{
    compile,
    env::env::GlobalEnv,
    runtime::value::{FALSE, NONE, POINTER_TAG, STRING_TAG},
};

fn main_body(source: &str) -> Vec<Instr> {
    compile(source, &GlobalEnv::new()).unwrap().main.body
}

fn procedure(source: &str, name: &str) -> Procedure {
    compile(source, &GlobalEnv::new())
        .unwrap()
        .procedures
        .into_iter()
        .find(|procedure| procedure.name == name)
        .unwrap()
}

fn contains(body: &[Instr], expected: &[Instr]) -> bool {
    body.windows(expected.len()).any(|window| window == expected)
}

#[test]
fn test_global_definition() {
    assert_eq!(
        main_body("a: int = 128\n"),
        vec![
            Instr::I64Const(NONE),
            Instr::LocalSet(RESULT_LOCAL.to_string()),
            Instr::I32Const(8),
            Instr::I64Const(128),
            Instr::I64Store { offset: 0 },
            Instr::LocalGet(RESULT_LOCAL.to_string()),
        ]
    );
}

#[test]
fn test_expression_statement_sets_result() {
    let body = main_body("a: int = 1\na\n");

    assert!(contains(
        &body,
        &[
            Instr::I32Const(8),
            Instr::I64Load { offset: 0 },
            Instr::LocalSet(RESULT_LOCAL.to_string()),
        ]
    ));
}

#[test]
fn test_comparison_is_retagged() {
    let body = main_body("1 < 2\n");

    assert!(contains(
        &body,
        &[
            Instr::I64LtS,
            Instr::I64ExtendI32U,
            Instr::I64Const(FALSE),
            Instr::I64Add,
        ]
    ));
}

#[test]
fn test_and_short_circuits() {
    let body = main_body("False and True\n");

    assert!(body.iter().any(|instr| matches!(
        instr,
        Instr::If {
            result: true,
            otherwise,
            ..
        } if otherwise == &vec![Instr::I64Const(FALSE)]
    )));
}

#[test]
fn test_while_loop_shape() {
    let body = main_body("i: int = 0\nwhile i < 3:\n    i = i + 1\n");

    let Some(Instr::Block(block)) = body.iter().find(|instr| matches!(instr, Instr::Block(_)))
    else {
        panic!("no block emitted");
    };
    let [Instr::Loop(looped)] = block.as_slice() else {
        panic!("block does not hold a single loop");
    };

    assert!(contains(looped, &[Instr::I32WrapI64, Instr::I32Eqz, Instr::BrIf(1)]));
    assert_eq!(looped.last(), Some(&Instr::Br(0)));
}

#[test]
fn test_function_returns_none_by_default() {
    let function = procedure("def f(x: int):\n    print(x)\n", "f");

    assert_eq!(function.params, vec![String::from("x")]);
    assert_eq!(function.body.last(), Some(&Instr::I64Const(NONE)));
    assert!(contains(
        &function.body,
        &[Instr::Call(runtime_name("print")), Instr::Drop]
    ));
}

#[test]
fn test_method_retags_receiver() {
    let source = "class A(object):\n    x: int = 1\n    def get(self: A) -> int:\n        return self.x\n";
    let method = procedure(source, "A$get");

    assert_eq!(
        method.body[..4],
        [
            Instr::LocalGet(String::from("self")),
            Instr::I64Const(POINTER_TAG),
            Instr::I64Add,
            Instr::LocalSet(String::from("self")),
        ]
    );
    assert!(contains(
        &method.body,
        &[
            Instr::Call(runtime_name("assert_non_none")),
            Instr::I64Const(POINTER_TAG),
            Instr::I64Sub,
            Instr::I32WrapI64,
            Instr::I64Load { offset: 0 },
            Instr::Return,
        ]
    ));
}

#[test]
fn test_constructor_allocates_every_field() {
    let source = "class P(object):\n    x: int = 1\n    y: int = -2\nP()\n";
    let body = main_body(source);

    assert!(contains(
        &body,
        &[Instr::I64Const(16), Instr::Call(runtime_name("malloc"))]
    ));
    assert!(contains(
        &body,
        &[Instr::Call(String::from("P$__init__")), Instr::Drop]
    ));

    let ctor = procedure(source, "P$__init__");
    assert_eq!(ctor.params, vec![String::from("self")]);
    assert_eq!(
        ctor.body[..4],
        [
            Instr::LocalGet(String::from("self")),
            Instr::I32WrapI64,
            Instr::I64Const(1),
            Instr::I64Store { offset: 0 },
        ]
    );
    assert!(contains(
        &ctor.body,
        &[
            Instr::I64Const(2),
            Instr::I64Sub,
            Instr::I64Store { offset: 8 }
        ]
    ));
}

#[test]
fn test_field_default_expression_runs_in_constructor() {
    let source = "class P(object):\n    x: int = 1 + 2\n";
    let ctor = procedure(source, "P$__init__");

    assert!(contains(
        &ctor.body,
        &[
            Instr::I64Const(1),
            Instr::I64Const(2),
            Instr::I64Add,
            Instr::I64Store { offset: 0 },
        ]
    ));
}

#[test]
fn test_string_literal_is_stored_bytewise() {
    let body = main_body("\"hi\"\n");

    assert!(contains(
        &body,
        &[Instr::I64Const(3), Instr::Call(runtime_name("malloc"))]
    ));
    assert!(contains(
        &body,
        &[Instr::I32Const(b'i' as i32), Instr::I32Store8 { offset: 1 }]
    ));
    assert!(contains(
        &body,
        &[Instr::I32Const(0), Instr::I32Store8 { offset: 2 }]
    ));
    assert!(contains(&body, &[Instr::I64Const(STRING_TAG), Instr::I64Add]));
}

#[test]
fn test_slice_passes_none_for_missing_bounds() {
    let body = main_body("\"abc\"[::2]\n");

    assert!(contains(
        &body,
        &[
            Instr::I64Const(NONE),
            Instr::I64Const(NONE),
            Instr::I64Const(2),
            Instr::I64Const(3),
            Instr::Call(runtime_name("str_slice")),
        ]
    ));
}

#[test]
fn test_main_procedure_wat() {
    let result = compile("1\n", &GlobalEnv::new()).unwrap();
    let wat = result.main.to_wat();

    assert_eq!(result.main.export.as_deref(), Some(EXPORT_NAME));
    assert!(wat.starts_with("(func $$main (export \"exported_func\") (result i64)"));
    assert!(wat.contains("(local $$last i64)"));
    assert!(wat.contains("i64.const 1"));
}

#[test]
fn test_module_lists_imports_and_procedures() {
    let result = compile(
        "class A(object):\n    pass\ndef f() -> int:\n    return 1\n",
        &GlobalEnv::new(),
    )
    .unwrap();
    let module = emit_module(&result.main, &result.procedures, &result.env);

    assert!(module.contains("(import \"imports\" \"memory\" (memory 2 100))"));
    assert!(module.contains(
        "(func $rt$str_concat (param i64) (param i64) (result i64))"
    ));
    assert!(module.contains(";; class 0 = A"));
    assert!(module.contains("(func $f (result i64)"));
    assert!(module.contains("(func $A$__init__ (param $self i64) (result i64)"));
}

#[test]
fn test_import_lookup() {
    assert_eq!(lookup_import("rt$str_slice"), Some(("str_slice", 5)));
    assert_eq!(lookup_import("rt$print_none"), Some(("print_none", 0)));
    assert_eq!(lookup_import("str_slice"), None);
    assert_eq!(lookup_import("rt$unknown"), None);
}
