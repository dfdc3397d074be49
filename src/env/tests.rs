use pretty_assertions::assert_eq;

use super::env::{
    augment_env, field_offset, first_define_offset, mangle, resolve_global, GlobalEnv,
};
use crate::{
    ast::{statements::Stmt, types::Type},
    errors::errors::Error,
    lexer::lexer::tokenize,
    parser::parser::parse,
    Position,
};

fn program(source: &str) -> Vec<Stmt> {
    parse(tokenize(source).unwrap()).unwrap()
}

fn augment(env: &GlobalEnv, source: &str) -> Result<GlobalEnv, Error> {
    augment_env(env, &program(source))
}

#[test]
fn test_new_env_has_builtins() {
    let env = GlobalEnv::new();

    assert!(env.funcs.contains_key("print"));
    assert_eq!(env.funcs["len"].ret, Type::Int);
    assert_eq!(env.next_offset, 8);
    assert!(env.globals.is_empty());
}

#[test]
fn test_globals_get_increasing_offsets() {
    let env = augment(&GlobalEnv::new(), "a: int = 1\nb: bool = True\n").unwrap();

    assert_eq!(env.globals["a"], (Type::Int, 8));
    assert_eq!(env.globals["b"], (Type::Bool, 16));
    assert_eq!(env.next_offset, 24);
}

#[test]
fn test_augment_does_not_touch_previous_env() {
    let first = augment(&GlobalEnv::new(), "a: int = 1\n").unwrap();
    let second = augment(&first, "b: int = 2\n").unwrap();

    assert_eq!(first.globals.len(), 1);
    assert_eq!(second.globals.len(), 2);
    assert_eq!(second.globals["b"].1, 16);
}

#[test]
fn test_redeclaring_global_takes_new_slot() {
    let first = augment(&GlobalEnv::new(), "a: int = 1\n").unwrap();
    let second = augment(&first, "a: bool = True\n").unwrap();

    assert_eq!(second.globals["a"], (Type::Bool, 16));
}

#[test]
fn test_global_defined_twice_in_one_snippet() {
    let source = "a: int = 1\nb: int = 2\na: bool = True\n";
    let env = augment(&GlobalEnv::new(), source).unwrap();

    assert_eq!(env.globals["a"], (Type::Bool, 24));
    assert_eq!(env.next_offset, 32);

    assert_eq!(first_define_offset(&env, &program(source)), 8);
}

#[test]
fn test_function_signature() {
    let env = augment(
        &GlobalEnv::new(),
        "def f(a: int, b: bool) -> int:\n    return a\n",
    )
    .unwrap();

    let sig = &env.funcs["f"];
    assert_eq!(sig.param_types(), vec![Type::Int, Type::Bool]);
    assert_eq!(sig.ret, Type::Int);
}

#[test]
fn test_unknown_annotation() {
    let error = augment(&GlobalEnv::new(), "a: float = 1\n").unwrap_err();
    assert_eq!(error.get_error_name(), "TypeError");
}

#[test]
fn test_class_layout() {
    let source = "class Point(object):\n    x: int = 0\n    y: int = 0\n    def norm(self: Point) -> int:\n        return 0\n";
    let env = augment(&GlobalEnv::new(), source).unwrap();

    let layout = &env.classes["Point"];
    assert_eq!(layout.table_id, 0);
    assert_eq!(layout.size(), 16);
    assert_eq!(field_offset(&env, "Point", "x", Position::null()).unwrap(), 0);
    assert_eq!(field_offset(&env, "Point", "y", Position::null()).unwrap(), 8);
    assert!(layout.methods.contains_key("norm"));
    assert!(env.funcs.contains_key(&mangle("Point", "norm")));
    assert!(env.funcs.contains_key("Point$__init__"));
    // No __init__ was written, so one is synthesized
    assert!(layout.ctor.decl.is_none());
    assert_eq!(env.next_class_id, 1);
}

#[test]
fn test_unknown_field_offset() {
    let env = augment(&GlobalEnv::new(), "class A:\n    x: int = 0\n").unwrap();
    let error = field_offset(&env, "A", "z", Position::null()).unwrap_err();
    assert_eq!(error.get_error_name(), "ScopeError");
}

#[test]
fn test_class_may_reference_later_class() {
    let source = "class A:\n    b: B = None\nclass B:\n    a: A = None\n";
    let env = augment(&GlobalEnv::new(), source).unwrap();

    assert_eq!(env.classes["A"].members["b"].1, Type::Class(String::from("B")));
    assert_eq!(env.classes["B"].table_id, 1);
}

#[test]
fn test_redefined_class_keeps_table_id() {
    let first = augment(&GlobalEnv::new(), "class A:\n    pass\nclass B:\n    pass\n").unwrap();
    let second = augment(&first, "class A:\n    x: int = 1\n").unwrap();

    assert_eq!(second.classes["A"].table_id, 0);
    assert_eq!(second.classes["A"].members.len(), 1);
    assert_eq!(second.next_class_id, 2);
}

#[test]
fn test_constructor_with_parameters() {
    let source = "class A:\n    def __init__(self: A, x: int):\n        pass\n";
    let error = augment(&GlobalEnv::new(), source).unwrap_err();
    assert_eq!(error.get_error_name(), "ArgumentError");
}

#[test]
fn test_constructor_with_return_type() {
    let source = "class A:\n    def __init__(self: A) -> int:\n        return 1\n";
    let error = augment(&GlobalEnv::new(), source).unwrap_err();
    assert_eq!(error.get_error_name(), "TypeError");
}

#[test]
fn test_method_without_receiver() {
    let error = augment(&GlobalEnv::new(), "class A:\n    def f() -> int:\n        return 1\n").unwrap_err();
    assert_eq!(error.get_error_name(), "ArgumentError");
}

#[test]
fn test_method_with_wrong_receiver_type() {
    let error = augment(&GlobalEnv::new(), "class A:\n    def f(self: int):\n        pass\n").unwrap_err();
    assert_eq!(error.get_error_name(), "TypeError");
}

#[test]
fn test_duplicate_method() {
    let source = "class A:\n    def f(self: A):\n        pass\n    def f(self: A):\n        pass\n";
    let error = augment(&GlobalEnv::new(), source).unwrap_err();
    assert_eq!(error.get_error_name(), "ScopeError");
    assert_eq!(error.get_position().line, 4);
}

#[test]
fn test_function_and_class_collide() {
    let error = augment(&GlobalEnv::new(), "class f:\n    pass\ndef f():\n    pass\n").unwrap_err();
    assert_eq!(error.get_error_name(), "ScopeError");
}

#[test]
fn test_later_function_replaces_class() {
    let first = augment(&GlobalEnv::new(), "class f:\n    pass\n").unwrap();
    let second = augment(&first, "def f() -> int:\n    return 1\n").unwrap();

    assert!(!second.classes.contains_key("f"));
    assert!(!second.funcs.contains_key("f$__init__"));
    assert_eq!(second.funcs["f"].ret, Type::Int);
}

#[test]
fn test_none_typed_global() {
    let error = augment(&GlobalEnv::new(), "a: None = None\n").unwrap_err();
    assert_eq!(error.get_error_name(), "TypeError");
}

#[test]
fn test_resolve_global() {
    let env = augment(&GlobalEnv::new(), "a: int = 1\n").unwrap();

    assert_eq!(resolve_global(Position::null(), &env, "a").unwrap().1, 8);
    assert_eq!(
        resolve_global(Position::null(), &env, "b")
            .unwrap_err()
            .get_error_name(),
        "ScopeError"
    );
}

#[test]
fn test_global_region_exhausted() {
    let mut env = GlobalEnv::new();
    env.next_offset = crate::runtime::memory::HEAP_START - 8;

    let env = augment(&env, "a: int = 1\n").unwrap();
    let error = augment(&env, "b: int = 2\n").unwrap_err();
    assert_eq!(error.get_error_name(), "ValueError");
}
