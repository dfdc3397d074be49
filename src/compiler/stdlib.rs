//! Runtime imports and module assembly.
//!
//! The emitted code relies on a small host surface: one formatter per value
//! tag, the bump allocator and the string primitives. Imports are called
//! through procedure names prefixed with `rt$`, which no user function can
//! produce.

use tracing::debug;

use crate::{
    env::env::GlobalEnv,
    runtime::memory::{INITIAL_PAGES, MAX_PAGES},
};

use super::compiler::Procedure;

/// Prefix of every runtime import's procedure name.
pub const IMPORT_PREFIX: &str = "rt$";

/// Module name the host provides the imports under.
pub const IMPORT_MODULE: &str = "imports";

/// Host imports and their parameter counts. Every import returns an i64.
pub const IMPORTS: &[(&str, usize)] = &[
    ("print", 1),
    ("print_num", 1),
    ("print_bool", 1),
    ("print_none", 0),
    ("print_str", 1),
    ("print_obj", 2),
    ("assert_non_none", 1),
    ("malloc", 1),
    ("str_len", 1),
    ("str_concat", 2),
    ("str_eq", 2),
    ("str_neq", 2),
    ("str_mult", 2),
    ("str_slice", 5),
];

/// Procedure name under which the import `name` is called.
pub fn runtime_name(name: &str) -> String {
    format!("{}{}", IMPORT_PREFIX, name)
}

/// Splits an `rt$` procedure name into the import it calls and its arity.
pub fn lookup_import(procedure: &str) -> Option<(&'static str, usize)> {
    let name = procedure.strip_prefix(IMPORT_PREFIX)?;
    IMPORTS
        .iter()
        .find(|(import, _)| *import == name)
        .copied()
}

/// Assembles a complete WebAssembly text module: the memory and host
/// imports, every procedure, and the main procedure last.
///
/// The class table is listed as comments so a reader can map the table ids
/// passed to `print_obj` back to class names.
pub fn emit_module(main: &Procedure, procedures: &[Procedure], env: &GlobalEnv) -> String {
    let mut lines = vec![String::from("(module")];

    lines.push(format!(
        "  (import \"{}\" \"memory\" (memory {} {}))",
        IMPORT_MODULE, INITIAL_PAGES, MAX_PAGES
    ));

    for (name, arity) in IMPORTS {
        let params = " (param i64)".repeat(*arity);
        lines.push(format!(
            "  (import \"{}\" \"{}\" (func ${}{} (result i64)))",
            IMPORT_MODULE,
            name,
            runtime_name(name),
            params
        ));
    }

    for (table_id, class) in env.class_names() {
        lines.push(format!("  ;; class {} = {}", table_id, class));
    }

    for procedure in procedures.iter().chain(std::iter::once(main)) {
        for line in procedure.to_wat().lines() {
            lines.push(format!("  {}", line));
        }
    }

    lines.push(String::from(")"));

    debug!(procedures = procedures.len() + 1, "assembled module");
    lines.join("\n")
}
