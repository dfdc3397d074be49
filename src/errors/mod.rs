//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process and by the runtime host. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants grouped into the user-facing error kinds
//! - Source decoration (line context and caret underline)
//! - Helpful suggestions for common mistakes

pub mod errors;

#[cfg(test)]
mod tests;
