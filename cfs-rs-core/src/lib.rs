//! Numerical building blocks shared by the `cfs-rs` correlation filter crates.
//!
//! The only transform the trainer needs is an N-dimensional discrete Fourier
//! transform over `ndarray` storage, provided by [`num_rs::fftn`] and
//! [`num_rs::ifftn`].

#![deny(missing_docs)]

use core::fmt;

/// Numpy-flavoured array numerics.
pub mod num_rs;

/// Errors raised by the numerical core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Argument passed into a function was invalid.
    InvalidArg {
        /// The invalid arg
        arg: String,
        /// Explaining why arg is invalid.
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArg { arg, reason } => write!(f, "Invalid argument `{arg}`: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias over [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
