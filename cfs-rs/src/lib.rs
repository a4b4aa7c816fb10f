//! Trade-off correlation filter training.
//!
//! `cfs-rs` builds optimal trade-off synthetic discriminant function (OTSDF)
//! correlation filters. A [`FilterTrainer`](filter::FilterTrainer)
//! accumulates *authentic* examples the filter should respond to and
//! *impostor* examples it should suppress, rejects duplicates across both
//! classes after aligning them to a canonical shape, and synthesizes the
//! filter coefficients on demand.
//!
//! Signals may be sequences, images or any N-dimensional `ndarray`; every
//! element type with an `as` conversion to the trainer's float type is
//! accepted through [`ReadSignal`](signal::ReadSignal).
//!
//! ```
//! use cfs_rs::filter::FilterTrainer;
//! use cfs_rs::nd::Array2;
//!
//! let target = Array2::from_shape_fn((16, 16), |(i, j)| ((i * j) % 5) as u8);
//! let clutter = Array2::from_shape_fn((16, 16), |(i, j)| ((i + 3 * j) % 7) as u8);
//!
//! let mut trainer = FilterTrainer::<f64>::new(1e-5, 1.0 - 1e-5, 0.5).unwrap();
//! assert!(trainer.add_auth(&target));
//! assert!(trainer.add_imp(&clutter));
//! assert!(!trainer.add_imp(&target));
//!
//! let filter = trainer.train().unwrap();
//! assert!((filter.peak_response(&target).unwrap() - 1.0).abs() < 1e-9);
//! assert!(filter.peak_response(&clutter).unwrap().abs() < 1e-9);
//! ```

pub mod filter;
pub mod kernel;
pub mod signal;
pub mod traits;
pub mod training;

pub use nalgebra as na;
pub use ndarray as nd;
