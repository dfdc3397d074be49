use pretty_assertions::assert_eq;

use super::{
    host::{Host, SLICE_INDEX, SLICE_RANGE},
    machine::{Machine, MAX_CALL_DEPTH},
    memory::{LinearMemory, HEAP_START, MAX_PAGES, PAGE_SIZE},
    strings,
    value::{Value, FALSE, NONE, POINTER_TAG, STRING_TAG, TRUE},
};
use crate::{
    ast::types::Type,
    compiler::{compiler::Procedure, instructions::Instr},
    errors::errors::ErrorImpl,
};

fn string(host: &mut Host, text: &str) -> i64 {
    strings::allocate(&mut host.memory, text.as_bytes()).unwrap() as i64 + STRING_TAG
}

fn text(host: &Host, word: i64) -> String {
    host.format_value(&Value::decode(word)).unwrap()
}

fn procedure(name: &str, params: &[&str], locals: &[&str], body: Vec<Instr>) -> Procedure {
    Procedure {
        name: name.to_string(),
        params: params.iter().map(|param| param.to_string()).collect(),
        locals: locals.iter().map(|local| local.to_string()).collect(),
        body,
        export: None,
    }
}

#[test]
fn test_decode_priority() {
    assert_eq!(Value::decode(TRUE), Value::Bool(true));
    assert_eq!(Value::decode(FALSE), Value::Bool(false));
    assert_eq!(Value::decode(NONE), Value::None);
    assert_eq!(
        Value::decode(POINTER_TAG + 64),
        Value::Object {
            class: None,
            address: 64
        }
    );
    assert_eq!(Value::decode(STRING_TAG + 64), Value::Str(64));
    assert_eq!(Value::decode(-7), Value::Int(-7));
}

#[test]
fn test_encode_is_inverse_of_decode() {
    for value in [
        Value::None,
        Value::Bool(true),
        Value::Int(128),
        Value::Str(HEAP_START),
    ] {
        assert_eq!(Value::decode(value.encode()), value);
    }
}

#[test]
fn test_decode_typed() {
    assert_eq!(
        Value::decode_typed(POINTER_TAG + 8, &Type::Class(String::from("P"))),
        Value::Object {
            class: Some(String::from("P")),
            address: 8
        }
    );
    assert_eq!(Value::decode_typed(STRING_TAG, &Type::Int), Value::Int(STRING_TAG));
    assert_eq!(
        Value::decode_typed(NONE, &Type::Class(String::from("P"))),
        Value::None
    );
}

#[test]
fn test_object_display() {
    let value = Value::Object {
        class: Some(String::from("Point")),
        address: 65536,
    };
    assert_eq!(value.to_string(), "<Point object at 0x10000>");
}

#[test]
fn test_malloc_rounds_to_words() {
    let mut memory = LinearMemory::new();

    assert_eq!(memory.heap_pointer().unwrap(), HEAP_START);
    assert_eq!(memory.malloc(3).unwrap(), HEAP_START);
    assert_eq!(memory.malloc(16).unwrap(), HEAP_START + 8);
    assert_eq!(memory.heap_pointer().unwrap(), HEAP_START + 24);
}

#[test]
fn test_malloc_grows_memory() {
    let mut memory = LinearMemory::new();
    let pages = memory.pages();

    memory.malloc(PAGE_SIZE as u64 * 2).unwrap();
    assert!(memory.pages() > pages);
}

#[test]
fn test_out_of_bounds_access() {
    let memory = LinearMemory::new();
    let error = memory.load_word(memory.size() as u32).unwrap_err();
    assert_eq!(error.get_error_name(), "ValueError");
}

#[test]
fn test_string_index() {
    let mut host = Host::new();
    let s = string(&mut host, "1 2 3 4 5 6 7 8");

    let last = host.str_slice(s, -1, NONE, NONE, SLICE_INDEX).unwrap();
    assert_eq!(text(&host, last), "8");

    let first = host.str_slice(s, 0, NONE, NONE, SLICE_INDEX).unwrap();
    assert_eq!(text(&host, first), "1");

    let error = host.str_slice(s, 15, NONE, NONE, SLICE_INDEX).unwrap_err();
    assert_eq!(error.get_error_name(), "ValueError");
}

#[test]
fn test_string_slices() {
    let mut host = Host::new();
    let s = string(&mut host, "1 2 3 4 5 6 7 8");

    let head = host.str_slice(s, 0, -5, NONE, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, head), "1 2 3 4 5 ");

    let contradicting = host.str_slice(s, 5, 2, NONE, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, contradicting), "");

    let backwards = host.str_slice(s, 2, 5, -1, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, backwards), "");

    let reversed = host.str_slice(s, NONE, NONE, -2, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, reversed), "87654321");

    let digits = string(&mut host, "123456");
    let all = host.str_slice(digits, 0, 6, 2, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, all), "135");
}

#[test]
fn test_huge_steps_stop_at_the_end() {
    assert_eq!(
        strings::slice_indices(2, Some(1), None, Some(i64::MAX)).unwrap(),
        vec![1]
    );
    assert_eq!(
        strings::slice_indices(2, None, None, Some(i64::MIN + 1)).unwrap(),
        vec![1]
    );
    assert_eq!(
        strings::slice_indices(3, Some(0), None, Some(i64::MIN)).unwrap(),
        vec![0]
    );

    let mut host = Host::new();
    let s = string(&mut host, "ab");
    let tail = host.str_slice(s, 1, NONE, i64::MAX, SLICE_RANGE).unwrap();
    assert_eq!(text(&host, tail), "b");
}

#[test]
fn test_zero_step() {
    let mut host = Host::new();
    let s = string(&mut host, "abc");

    let error = host.str_slice(s, NONE, NONE, 0, SLICE_RANGE).unwrap_err();
    assert_eq!(error.get_error_name(), "ValueError");
}

#[test]
fn test_slice_visits_ceil_len_over_step() {
    for len in 0..12usize {
        for step in 1..5i64 {
            let visited = strings::slice_indices(len, Some(0), Some(len as i64), Some(step)).unwrap();
            assert_eq!(visited.len(), len.div_ceil(step as usize));
        }
    }
}

#[test]
fn test_concat_length() {
    let mut host = Host::new();

    for (left, right) in [("", ""), ("ab", ""), ("", "cd"), ("hello ", "world")] {
        let (a, b) = (string(&mut host, left), string(&mut host, right));
        let joined = host.str_concat(a, b).unwrap();

        assert_eq!(
            host.str_len(joined).unwrap(),
            host.str_len(a).unwrap() + host.str_len(b).unwrap()
        );
    }
}

#[test]
fn test_string_comparison_and_repeat() {
    let mut host = Host::new();
    let (a, b, c) = (
        string(&mut host, "ab"),
        string(&mut host, "ab"),
        string(&mut host, "abc"),
    );

    assert_eq!(host.str_eq(a, b).unwrap(), TRUE);
    assert_eq!(host.str_eq(a, c).unwrap(), FALSE);
    assert_eq!(host.str_neq(a, c).unwrap(), TRUE);

    let repeated = host.str_mult(a, 3).unwrap();
    assert_eq!(text(&host, repeated), "ababab");
    let empty = host.str_mult(a, -1).unwrap();
    assert_eq!(text(&host, empty), "");
}

#[test]
fn test_oversized_repeat_is_out_of_memory() {
    let mut host = Host::new();
    let s = string(&mut host, "a");
    let before = host.memory.heap_pointer().unwrap();

    let error = host.str_mult(s, 4_000_000_000).unwrap_err();
    assert!(matches!(error.get_impl(), ErrorImpl::OutOfMemory { .. }));
    assert_eq!(error.get_error_name(), "ValueError");

    let wide = string(&mut host, "abcdefgh");
    let error = host.str_mult(wide, i64::MAX).unwrap_err();
    assert!(matches!(error.get_impl(), ErrorImpl::OutOfMemory { .. }));

    // Failed requests leave the heap where it was
    assert_eq!(host.memory.heap_pointer().unwrap(), before + 16);
}

#[test]
fn test_malloc_rejects_sizes_past_the_limit() {
    let mut memory = LinearMemory::new();

    for size in [u64::MAX, u64::MAX - 3, (MAX_PAGES * PAGE_SIZE) as u64] {
        assert_eq!(memory.malloc(size).unwrap_err().get_error_name(), "ValueError");
    }
    assert_eq!(memory.heap_pointer().unwrap(), HEAP_START);
}

#[test]
fn test_print_formatters() {
    let mut host = Host::new();
    let s = string(&mut host, "hi");

    host.print_num(-3).unwrap();
    host.print_bool(TRUE).unwrap();
    host.print_none().unwrap();
    host.print_str(s).unwrap();
    host.print(FALSE).unwrap();

    assert_eq!(host.take_output(), vec!["-3", "True", "None", "hi", "False"]);
    assert!(host.output().is_empty());
}

#[test]
fn test_assert_non_none() {
    let host = Host::new();

    assert_eq!(host.assert_non_none(POINTER_TAG).unwrap(), POINTER_TAG);
    assert_eq!(
        host.assert_non_none(NONE).unwrap_err().get_error_name(),
        "ValueError"
    );
}

#[test]
fn test_machine_arithmetic_and_host_calls() {
    let mut machine = Machine::new();
    let main = procedure(
        "$main",
        &[],
        &[],
        vec![
            Instr::I64Const(40),
            Instr::I64Const(2),
            Instr::I64Add,
            Instr::Call(String::from("rt$print_num")),
            Instr::Drop,
            Instr::I64Const(7),
            Instr::I64Const(-2),
            Instr::I64DivS,
        ],
    );

    assert_eq!(machine.run(&main).unwrap(), -3);
    assert_eq!(machine.host.take_output(), vec!["42"]);
}

#[test]
fn test_machine_loop_and_branches() {
    // i = 0; while i < 5: i = i + 1
    let mut machine = Machine::new();
    let main = procedure(
        "$main",
        &[],
        &["i"],
        vec![
            Instr::Block(vec![Instr::Loop(vec![
                Instr::LocalGet(String::from("i")),
                Instr::I64Const(5),
                Instr::I64LtS,
                Instr::I32Eqz,
                Instr::BrIf(1),
                Instr::LocalGet(String::from("i")),
                Instr::I64Const(1),
                Instr::I64Add,
                Instr::LocalSet(String::from("i")),
                Instr::Br(0),
            ])]),
            Instr::LocalGet(String::from("i")),
        ],
    );

    assert_eq!(machine.run(&main).unwrap(), 5);
}

#[test]
fn test_machine_calls_and_returns() {
    let mut machine = Machine::new();
    machine.load([procedure(
        "double",
        &["x"],
        &[],
        vec![
            Instr::LocalGet(String::from("x")),
            Instr::I64Const(2),
            Instr::I64Mul,
            Instr::Return,
            Instr::I64Const(NONE),
        ],
    )]);

    assert!(machine.has_procedure("double"));
    assert_eq!(machine.invoke("double", &[21]).unwrap(), 42);
}

#[test]
fn test_machine_rejects_calls_compiled_for_another_arity() {
    let identity = procedure(
        "f",
        &["x"],
        &[],
        vec![Instr::LocalGet(String::from("x"))],
    );
    let caller = procedure(
        "g",
        &[],
        &[],
        vec![Instr::I64Const(1), Instr::Call(String::from("f"))],
    );

    let mut machine = Machine::new();
    machine.load([identity, caller]);
    assert_eq!(machine.invoke("g", &[]).unwrap(), 1);

    machine.load([procedure(
        "f",
        &["x", "y"],
        &[],
        vec![
            Instr::LocalGet(String::from("x")),
            Instr::LocalGet(String::from("y")),
            Instr::I64Add,
        ],
    )]);

    let error = machine.invoke("g", &[]).unwrap_err();
    assert_eq!(error.get_error_name(), "ArgumentError");
    assert_eq!(machine.invoke("f", &[1, 2]).unwrap(), 3);
}

#[test]
fn test_machine_division_by_zero() {
    let mut machine = Machine::new();
    let main = procedure(
        "$main",
        &[],
        &[],
        vec![Instr::I64Const(1), Instr::I64Const(0), Instr::I64RemS],
    );

    assert_eq!(
        machine.run(&main).unwrap_err().get_error_name(),
        "ValueError"
    );
}

#[test]
fn test_machine_recursion_limit() {
    // Unoptimized frames are large, so give the interpreter room to reach the limit
    let handle = std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(|| {
            let mut machine = Machine::new();
            machine.load([procedure(
                "forever",
                &[],
                &[],
                vec![Instr::Call(String::from("forever"))],
            )]);
            machine.invoke("forever", &[]).unwrap_err().get_message()
        })
        .unwrap();

    assert_eq!(
        handle.join().unwrap(),
        format!("maximum call depth of {} exceeded", MAX_CALL_DEPTH)
    );
}
