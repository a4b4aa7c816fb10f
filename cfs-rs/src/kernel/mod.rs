//! Shared kernel substrate.
//!
//! This module defines the constructor-validation lifecycle used by the
//! synthesis kernel and the trainer, and the error types every public
//! operation reports through.

mod errors;
mod lifecycle;

pub use errors::*;
pub use lifecycle::*;
