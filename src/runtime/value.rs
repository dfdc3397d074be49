//! Tagged 64-bit value encoding.
//!
//! Every slot holds one word. Words are classified by disjoint ranges, tested
//! in this order: the boolean pair, the `None` sentinel, object pointers,
//! string pointers, and finally plain integers. All tag arithmetic lives here
//! and in the matching constants emitted by the code generator.

use std::fmt::Display;

use crate::ast::types::Type;

pub const NONE: i64 = 1 << 61;
pub const FALSE: i64 = 1 << 62;
pub const TRUE: i64 = FALSE + 1;
pub const POINTER_TAG: i64 = 1 << 60;
pub const STRING_TAG: i64 = 1 << 59;
/// Width of the pointer and string ranges.
pub const ADDRESS_SPACE: i64 = 1 << 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    /// `class` is only known when decoding against a static type.
    Object {
        class: Option<String>,
        address: u32,
    },
    Str(u32),
}

impl Value {
    pub fn encode(&self) -> i64 {
        match self {
            Value::None => NONE,
            Value::Bool(true) => TRUE,
            Value::Bool(false) => FALSE,
            Value::Int(value) => *value,
            Value::Object { address, .. } => *address as i64 + POINTER_TAG,
            Value::Str(address) => *address as i64 + STRING_TAG,
        }
    }

    pub fn decode(word: i64) -> Value {
        if word == TRUE || word == FALSE {
            Value::Bool(word == TRUE)
        } else if word == NONE {
            Value::None
        } else if (POINTER_TAG..POINTER_TAG + ADDRESS_SPACE).contains(&word) {
            Value::Object {
                class: None,
                address: (word - POINTER_TAG) as u32,
            }
        } else if (STRING_TAG..STRING_TAG + ADDRESS_SPACE).contains(&word) {
            Value::Str((word - STRING_TAG) as u32)
        } else {
            Value::Int(word)
        }
    }

    /// Decodes `word` and attaches the class name when `ty` is a class type.
    /// Integers are taken as-is, since a large enough int falls in a tag range.
    pub fn decode_typed(word: i64, ty: &Type) -> Value {
        match (Value::decode(word), ty) {
            (_, Type::Int) => Value::Int(word),
            (Value::Object { address, .. }, Type::Class(name)) => Value::Object {
                class: Some(name.clone()),
                address,
            },
            (value, _) => value,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Object {
                class: Some(class),
                address,
            } => write!(f, "<{} object at {:#x}>", class, address),
            Value::Object { class: None, address } => write!(f, "<object at {:#x}>", address),
            Value::Str(address) => write!(f, "<str at {:#x}>", address),
        }
    }
}
