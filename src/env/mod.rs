//! Global symbol environment threaded between compilation turns.
//!
//! Holds global variable slots, function signatures and class layouts, and
//! the lookup helpers the type checker and code generator share.

pub mod env;

#[cfg(test)]
mod tests;
