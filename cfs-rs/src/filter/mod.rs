//! Correlation filter synthesis and the trainer that owns the training sets.

mod config;
mod otsdf;
mod shared;
mod trained;
mod trainer;

pub use config::*;
pub use otsdf::*;
pub use shared::*;
pub use trained::*;
pub use trainer::*;
