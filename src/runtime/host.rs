use std::collections::HashMap;

use tracing::debug;

use crate::{
    env::env::GlobalEnv,
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    memory::LinearMemory,
    strings,
    value::{Value, FALSE, NONE, STRING_TAG},
};

/// `kind` argument of `str_slice` selecting a single index.
pub const SLICE_INDEX: i64 = 1;
/// `kind` argument of `str_slice` selecting a `start:stop:step` slice.
pub const SLICE_RANGE: i64 = 3;

/// Host side of the emitted code: formatters, the allocator entry point and
/// the string primitives, all working on one linear memory.
#[derive(Debug, Clone, Default)]
pub struct Host {
    pub memory: LinearMemory,
    /// Table id to class name, for printing objects.
    classes: HashMap<u32, String>,
    output: Vec<String>,
}

fn bool_word(value: bool) -> i64 {
    FALSE + value as i64
}

fn optional(word: i64) -> Option<i64> {
    (word != NONE).then_some(word)
}

impl Host {
    pub fn new() -> Self {
        Host::default()
    }

    /// Reloads the class table from `env`.
    pub fn refresh_classes(&mut self, env: &GlobalEnv) {
        self.classes = env.class_names().into_iter().collect();
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn emit(&mut self, line: String) {
        debug!(line = %line, "print");
        self.output.push(line);
    }

    /// Renders a decoded value the way `print` shows it.
    pub fn format_value(&self, value: &Value) -> Result<String, Error> {
        match value {
            Value::Str(address) => strings::to_string(&self.memory, *address),
            other => Ok(other.to_string()),
        }
    }

    /// Polymorphic `print`: dispatches on the runtime tag.
    pub fn print(&mut self, word: i64) -> Result<i64, Error> {
        match Value::decode(word) {
            Value::Int(value) => self.print_num(value),
            Value::Bool(_) => self.print_bool(word),
            Value::None => self.print_none(),
            Value::Str(_) => self.print_str(word),
            value => {
                let line = self.format_value(&value)?;
                self.emit(line);
                Ok(NONE)
            }
        }
    }

    pub fn print_num(&mut self, value: i64) -> Result<i64, Error> {
        self.emit(value.to_string());
        Ok(NONE)
    }

    pub fn print_bool(&mut self, word: i64) -> Result<i64, Error> {
        let line = Value::decode(word).to_string();
        self.emit(line);
        Ok(NONE)
    }

    pub fn print_none(&mut self) -> Result<i64, Error> {
        self.emit(String::from("None"));
        Ok(NONE)
    }

    pub fn print_str(&mut self, word: i64) -> Result<i64, Error> {
        let line = strings::to_string(&self.memory, self.string_address(word)?)?;
        self.emit(line);
        Ok(NONE)
    }

    /// Prints an object from its raw address and class table id.
    pub fn print_obj(&mut self, address: i64, table_id: i64) -> Result<i64, Error> {
        let value = Value::Object {
            class: self.classes.get(&(table_id as u32)).cloned(),
            address: address as u32,
        };
        let line = value.to_string();
        self.emit(line);
        Ok(NONE)
    }

    pub fn assert_non_none(&self, word: i64) -> Result<i64, Error> {
        if word == NONE {
            return Err(Error::new(ErrorImpl::NoneReceiver, Position::null()));
        }
        Ok(word)
    }

    pub fn malloc(&mut self, size: i64) -> Result<i64, Error> {
        let size = u64::try_from(size).map_err(|_| {
            Error::new(
                ErrorImpl::OutOfMemory {
                    requested: size as u64,
                },
                Position::null(),
            )
        })?;

        Ok(self.memory.malloc(size)? as i64)
    }

    fn string_address(&self, word: i64) -> Result<u32, Error> {
        match Value::decode(word) {
            Value::Str(address) => Ok(address),
            Value::None => Err(Error::new(ErrorImpl::NoneReceiver, Position::null())),
            other => Err(Error::internal(format!("expected a string, found {:?}", other))),
        }
    }

    pub fn str_len(&self, s: i64) -> Result<i64, Error> {
        Ok(strings::length(&self.memory, self.string_address(s)?)? as i64)
    }

    pub fn str_concat(&mut self, left: i64, right: i64) -> Result<i64, Error> {
        let (left, right) = (self.string_address(left)?, self.string_address(right)?);
        Ok(strings::concat(&mut self.memory, left, right)? as i64 + STRING_TAG)
    }

    pub fn str_eq(&self, left: i64, right: i64) -> Result<i64, Error> {
        let (left, right) = (self.string_address(left)?, self.string_address(right)?);
        Ok(bool_word(strings::equals(&self.memory, left, right)?))
    }

    pub fn str_neq(&self, left: i64, right: i64) -> Result<i64, Error> {
        let (left, right) = (self.string_address(left)?, self.string_address(right)?);
        Ok(bool_word(strings::not_equals(&self.memory, left, right)?))
    }

    pub fn str_mult(&mut self, s: i64, times: i64) -> Result<i64, Error> {
        let s = self.string_address(s)?;
        Ok(strings::repeat(&mut self.memory, s, times)? as i64 + STRING_TAG)
    }

    /// `s[start]` when `kind` is `SLICE_INDEX`, `s[start:stop:step]` otherwise.
    /// Omitted bounds arrive as `None`.
    pub fn str_slice(
        &mut self,
        s: i64,
        start: i64,
        stop: i64,
        step: i64,
        kind: i64,
    ) -> Result<i64, Error> {
        let s = self.string_address(s)?;

        let address = if kind == SLICE_INDEX {
            strings::index(&mut self.memory, s, start)?
        } else {
            strings::slice(
                &mut self.memory,
                s,
                optional(start),
                optional(stop),
                optional(step),
            )?
        };

        Ok(address as i64 + STRING_TAG)
    }

    /// Dispatches a call to the import called `name`.
    pub fn call(&mut self, name: &str, args: &[i64]) -> Result<i64, Error> {
        let arg = |index: usize| {
            args.get(index).copied().ok_or_else(|| {
                Error::internal(format!("import `{}` is missing argument {}", name, index))
            })
        };

        match name {
            "print" => self.print(arg(0)?),
            "print_num" => self.print_num(arg(0)?),
            "print_bool" => self.print_bool(arg(0)?),
            "print_none" => self.print_none(),
            "print_str" => self.print_str(arg(0)?),
            "print_obj" => self.print_obj(arg(0)?, arg(1)?),
            "assert_non_none" => self.assert_non_none(arg(0)?),
            "malloc" => self.malloc(arg(0)?),
            "str_len" => self.str_len(arg(0)?),
            "str_concat" => self.str_concat(arg(0)?, arg(1)?),
            "str_eq" => self.str_eq(arg(0)?, arg(1)?),
            "str_neq" => self.str_neq(arg(0)?, arg(1)?),
            "str_mult" => self.str_mult(arg(0)?, arg(1)?),
            "str_slice" => self.str_slice(arg(0)?, arg(1)?, arg(2)?, arg(3)?, arg(4)?),
            _ => Err(Error::internal(format!("unknown import `{}`", name))),
        }
    }
}
