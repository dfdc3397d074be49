//! Interpreter for the emitted stack machine code.
//!
//! Executes procedures directly over a `Host`, with the same observable
//! behavior a WebAssembly engine would have when given the emitted module
//! and the host's imports: i64 words on an operand stack, i32 values kept
//! in the low 32 bits, and structured control flow with label depths.

use std::{collections::HashMap, rc::Rc};

use tracing::{debug, trace};

use crate::{
    compiler::{compiler::Procedure, instructions::Instr, stdlib::lookup_import},
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::host::Host;

/// Maximum nesting of procedure calls before execution is aborted.
pub const MAX_CALL_DEPTH: usize = 1000;

const LOW_32: i64 = 0xFFFF_FFFF;

enum Flow {
    Normal,
    /// Unwinding to the label `depth` levels out.
    Branch(u32),
    Return,
}

struct Frame<'c> {
    locals: HashMap<String, i64>,
    stack: Vec<i64>,
    /// Arity each callee had when the running procedure was loaded.
    callees: Option<&'c HashMap<String, usize>>,
}

impl Frame<'_> {
    fn pop(&mut self) -> Result<i64, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::internal("operand stack underflow"))
    }

    fn pop_address(&mut self) -> Result<u32, Error> {
        Ok((self.pop()? & LOW_32) as u32)
    }

    fn binary(&mut self, op: impl FnOnce(i64, i64) -> i64) -> Result<(), Error> {
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(op(left, right));
        Ok(())
    }

    fn compare(&mut self, op: impl FnOnce(i64, i64) -> bool) -> Result<(), Error> {
        self.binary(|left, right| op(left, right) as i64)
    }
}

/// Unwinding out of a label consumes one level of branch depth.
fn leave_label(flow: Flow) -> Flow {
    match flow {
        Flow::Branch(0) => Flow::Normal,
        Flow::Branch(depth) => Flow::Branch(depth - 1),
        other => other,
    }
}

/// Calls inside `body` to loaded procedures, with the arity each callee
/// had at that moment.
fn collect_callees(body: &[Instr], arities: &HashMap<String, usize>, out: &mut HashMap<String, usize>) {
    for instr in body {
        match instr {
            Instr::Call(name) => {
                if let Some(arity) = arities.get(name) {
                    out.insert(name.clone(), *arity);
                }
            }
            Instr::Block(body) | Instr::Loop(body) => collect_callees(body, arities, out),
            Instr::If {
                then, otherwise, ..
            } => {
                collect_callees(then, arities, out);
                collect_callees(otherwise, arities, out);
            }
            _ => {}
        }
    }
}

#[derive(Debug)]
struct Loaded {
    procedure: Procedure,
    callees: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct Machine {
    pub host: Host,
    procedures: HashMap<String, Rc<Loaded>>,
    depth: usize,
}

impl Machine {
    pub fn new() -> Self {
        Machine::default()
    }

    /// Adds procedures, replacing any earlier ones with the same name.
    ///
    /// Procedures loaded together see each other's signatures; a procedure
    /// loaded earlier keeps expecting the signatures of its own batch.
    pub fn load(&mut self, procedures: impl IntoIterator<Item = Procedure>) {
        let batch = procedures.into_iter().collect::<Vec<_>>();

        let mut arities = self
            .procedures
            .iter()
            .map(|(name, loaded)| (name.clone(), loaded.procedure.params.len()))
            .collect::<HashMap<_, _>>();
        for procedure in &batch {
            arities.insert(procedure.name.clone(), procedure.params.len());
        }

        for procedure in batch {
            let mut callees = HashMap::new();
            collect_callees(&procedure.body, &arities, &mut callees);

            debug!(name = %procedure.name, "loaded procedure");
            self.procedures
                .insert(procedure.name.clone(), Rc::new(Loaded { procedure, callees }));
        }
    }

    pub fn has_procedure(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }

    /// Runs a loaded procedure by name.
    pub fn invoke(&mut self, name: &str, args: &[i64]) -> Result<i64, Error> {
        let loaded = self
            .procedures
            .get(name)
            .cloned()
            .ok_or_else(|| Error::internal(format!("no procedure named `{}`", name)))?;
        self.call_procedure(&loaded.procedure, Some(&loaded.callees), args)
    }

    /// Runs `procedure` without loading it, as is done for a snippet's main.
    pub fn run(&mut self, procedure: &Procedure) -> Result<i64, Error> {
        self.depth = 0;
        self.call_procedure(procedure, None, &[])
    }

    fn call_procedure(
        &mut self,
        procedure: &Procedure,
        callees: Option<&HashMap<String, usize>>,
        args: &[i64],
    ) -> Result<i64, Error> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Error::new(
                ErrorImpl::RecursionLimit {
                    limit: MAX_CALL_DEPTH,
                },
                Position::null(),
            ));
        }

        let mut locals = HashMap::new();
        for (param, arg) in procedure.params.iter().zip(args) {
            locals.insert(param.clone(), *arg);
        }
        for local in &procedure.locals {
            locals.insert(local.clone(), 0);
        }

        let mut frame = Frame {
            locals,
            stack: vec![],
            callees,
        };

        self.depth += 1;
        let flow = self.execute(&mut frame, &procedure.body);
        self.depth -= 1;
        flow?;

        frame.pop()
    }

    fn call(&mut self, frame: &mut Frame, name: &str) -> Result<(), Error> {
        let (arity, import) = match lookup_import(name) {
            Some((import, arity)) => (arity, Some(import)),
            None => {
                let loaded = self
                    .procedures
                    .get(name)
                    .ok_or_else(|| Error::internal(format!("call to unknown procedure `{}`", name)))?;
                let found = loaded.procedure.params.len();

                if let Some(&expected) = frame.callees.and_then(|callees| callees.get(name)) {
                    if expected != found {
                        return Err(Error::new(
                            ErrorImpl::StaleCall {
                                function: name.to_string(),
                                expected,
                                found,
                            },
                            Position::null(),
                        ));
                    }
                }
                (found, None)
            }
        };

        if frame.stack.len() < arity {
            return Err(Error::internal(format!("not enough arguments for `{}`", name)));
        }
        let args = frame.stack.split_off(frame.stack.len() - arity);

        let result = match import {
            Some(import) => {
                trace!(import, ?args, "host call");
                self.host.call(import, &args)?
            }
            None => self.invoke(name, &args)?,
        };
        frame.stack.push(result);
        Ok(())
    }

    fn execute(&mut self, frame: &mut Frame, instrs: &[Instr]) -> Result<Flow, Error> {
        for instr in instrs {
            match instr {
                Instr::I64Const(value) => frame.stack.push(*value),
                Instr::I32Const(value) => frame.stack.push(*value as u32 as i64),
                Instr::LocalGet(name) => {
                    let value = frame.locals.get(name).copied().ok_or_else(|| {
                        Error::internal(format!("unknown local `{}`", name))
                    })?;
                    frame.stack.push(value);
                }
                Instr::LocalSet(name) => {
                    let value = frame.pop()?;
                    frame.locals.insert(name.clone(), value);
                }

                Instr::I64Load { offset } => {
                    let address = frame.pop_address()?;
                    let value = self.host.memory.load_word(address.wrapping_add(*offset))?;
                    frame.stack.push(value);
                }
                Instr::I64Store { offset } => {
                    let value = frame.pop()?;
                    let address = frame.pop_address()?;
                    self.host.memory.store_word(address.wrapping_add(*offset), value)?;
                }
                Instr::I32Store8 { offset } => {
                    let value = frame.pop()?;
                    let address = frame.pop_address()?;
                    self.host.memory.store_byte(address.wrapping_add(*offset), value as u8)?;
                }
                Instr::I32WrapI64 | Instr::I64ExtendI32U => {
                    let value = frame.pop()?;
                    frame.stack.push(value & LOW_32);
                }

                Instr::I64Add => frame.binary(i64::wrapping_add)?,
                Instr::I64Sub => frame.binary(i64::wrapping_sub)?,
                Instr::I64Mul => frame.binary(i64::wrapping_mul)?,
                Instr::I64DivS | Instr::I64RemS => {
                    let right = frame.pop()?;
                    let left = frame.pop()?;
                    if right == 0 {
                        return Err(Error::new(ErrorImpl::DivisionByZero, Position::null()));
                    }
                    frame.stack.push(match instr {
                        Instr::I64DivS => left.wrapping_div(right),
                        _ => left.wrapping_rem(right),
                    });
                }
                Instr::I64And => frame.binary(|left, right| left & right)?,
                Instr::I64Or => frame.binary(|left, right| left | right)?,
                Instr::I64Xor => frame.binary(|left, right| left ^ right)?,

                Instr::I64Eq => frame.compare(|left, right| left == right)?,
                Instr::I64Ne => frame.compare(|left, right| left != right)?,
                Instr::I64LtS => frame.compare(|left, right| left < right)?,
                Instr::I64LeS => frame.compare(|left, right| left <= right)?,
                Instr::I64GtS => frame.compare(|left, right| left > right)?,
                Instr::I64GeS => frame.compare(|left, right| left >= right)?,
                Instr::I32Eqz => {
                    let value = frame.pop()?;
                    frame.stack.push((value & LOW_32 == 0) as i64);
                }

                Instr::Call(name) => self.call(frame, name)?,
                Instr::Drop => {
                    frame.pop()?;
                }
                Instr::Return => return Ok(Flow::Return),

                Instr::If {
                    then, otherwise, ..
                } => {
                    let condition = frame.pop()? & LOW_32;
                    let branch = if condition != 0 { then } else { otherwise };
                    match leave_label(self.execute(frame, branch)?) {
                        Flow::Normal => {}
                        flow => return Ok(flow),
                    }
                }
                Instr::Block(body) => match leave_label(self.execute(frame, body)?) {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                },
                Instr::Loop(body) => loop {
                    match self.execute(frame, body)? {
                        // Branching to a loop label restarts the loop
                        Flow::Branch(0) => continue,
                        Flow::Normal => break,
                        flow => return Ok(leave_label(flow)),
                    }
                },
                Instr::Br(depth) => return Ok(Flow::Branch(*depth)),
                Instr::BrIf(depth) => {
                    if frame.pop()? & LOW_32 != 0 {
                        return Ok(Flow::Branch(*depth));
                    }
                }
            }
        }

        Ok(Flow::Normal)
    }
}
