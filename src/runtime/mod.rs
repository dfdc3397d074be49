//! Runtime support for the emitted code.
//!
//! Value tagging, linear memory with its bump allocator, the host imports
//! (formatters and string primitives) and a machine that executes emitted
//! procedures against them.

pub mod host;
pub mod machine;
pub mod memory;
pub mod strings;
pub mod value;

#[cfg(test)]
mod tests;
