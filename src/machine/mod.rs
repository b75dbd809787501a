//! Counter register machine.
//!
//! Programs are line-oriented sources of `inc`, `deb` and `end` instructions,
//! each addressed by a step number. Loading turns source text into a
//! [`program::Program`]; [`program::Program::check`] finds jumps to undefined
//! steps; a [`processing_unit::ProcessingUnit`] runs a checked program against
//! a set of named [`registers::Registers`].
//!
//! # Modules
//!
//! - [`errors`]: Load, check and input error types
//! - [`isa`]: Instruction table, operations and their semantics
//! - [`program`]: Tokenizer, step resolution and the loaded program
//! - [`processing_unit`]: Execution loop and per-step trace hooks
//! - [`registers`]: Default-zero named counters

pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod processing_unit;
pub mod program;
pub mod registers;
