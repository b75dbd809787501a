//! Register machine library.
//!
//! Loads, checks and runs counter-machine programs. See [`machine`] for the
//! program format and execution model.

pub mod machine;
pub mod utils;
