//! Incremental compilation sessions.
//!
//! A `Session` compiles snippets one at a time against the environment
//! left by the previous successful turn, and runs each one on a machine
//! whose memory and procedures persist between turns.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::{
    ast::types::Type,
    compile,
    compiler::{compiler::Procedure, stdlib::emit_module},
    env::env::GlobalEnv,
    errors::errors::Error,
    runtime::{machine::Machine, value::Value},
    CompileResult,
};

/// What one turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Value of the trailing expression statement, if the snippet ends with one.
    pub value: Option<Value>,
    pub result_type: Option<Type>,
    /// Lines printed while running.
    pub output: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    env: GlobalEnv,
    machine: Machine,
    procedures: IndexMap<String, Procedure>,
    last_main: Option<Procedure>,
    turns: usize,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn env(&self) -> &GlobalEnv {
        &self.env
    }

    /// Compiles `source` against the session's environment without running
    /// it or changing the session.
    pub fn compile(&self, source: &str) -> Result<CompileResult, Error> {
        compile(source, &self.env)
    }

    /// Compiles and runs one snippet.
    ///
    /// A compile error leaves the session untouched. Once compilation
    /// succeeds the new environment and procedures are kept even if running
    /// fails; lines printed before a runtime error stay available through
    /// `take_output`.
    pub fn run(&mut self, source: &str) -> Result<Outcome, Error> {
        let result = self.compile(source)?;
        self.turns += 1;

        self.machine.load(result.procedures.iter().cloned());
        for procedure in result.procedures {
            self.procedures.insert(procedure.name.clone(), procedure);
        }
        self.env = result.env;
        self.machine.host.refresh_classes(&self.env);

        debug!(turn = self.turns, "running snippet");
        let word = self.machine.run(&result.main);
        self.last_main = Some(result.main);
        let word = word?;

        let value = result
            .result_type
            .as_ref()
            .map(|ty| Value::decode_typed(word, ty));

        info!(turn = self.turns, value = ?value, "snippet finished");

        Ok(Outcome {
            value,
            result_type: result.result_type,
            output: self.machine.host.take_output(),
        })
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.machine.host.take_output()
    }

    /// Renders a value the way `print` would, reading strings from memory.
    pub fn format(&self, value: &Value) -> Result<String, Error> {
        self.machine.host.format_value(value)
    }

    /// The module the session has built so far: every procedure declared
    /// in any turn plus the latest main procedure.
    pub fn module(&self) -> Option<String> {
        let main = self.last_main.as_ref()?;
        let procedures = self.procedures.values().cloned().collect::<Vec<_>>();
        Some(emit_module(main, &procedures, &self.env))
    }

    pub fn heap_pointer(&self) -> Result<u32, Error> {
        self.machine.host.memory.heap_pointer()
    }
}
