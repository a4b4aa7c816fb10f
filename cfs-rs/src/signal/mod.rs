//! Captured training signals and the policy that aligns them to a
//! trainer's canonical shape.

mod align;
mod io;

pub use align::*;
pub use io::*;

use crate::kernel::ConfigError;
use approx::RelativeEq;
use nalgebra::RealField;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

/// An owned, immutable N-dimensional real signal.
///
/// Rank 1 signals are sequences, rank 2 signals are images stored row-major.
/// A signal always holds at least one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal<F> {
    data: ArrayD<F>,
}

impl<F> Signal<F>
where
    F: RealField + Copy,
{
    /// Wrap an owned array, rejecting arrays without elements or axes and
    /// samples that are NaN or infinite.
    pub fn new(data: ArrayD<F>) -> Result<Self, ConfigError> {
        if data.ndim() == 0 || data.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "signal" });
        }
        if !data.iter().all(|v| v.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg: "signal",
                reason: "must be finite",
            });
        }
        Ok(Self { data })
    }

    /// Build a signal from a flat row-major buffer and an explicit shape.
    ///
    /// ```
    /// use cfs_rs::signal::Signal;
    ///
    /// let s = Signal::from_shape_vec(&[2, 3], vec![1.0f64, 2., 3., 4., 5., 6.]).unwrap();
    /// assert_eq!(s.shape(), &[2, 3]);
    /// assert_eq!(s.len(), 6);
    /// ```
    pub fn from_shape_vec(shape: &[usize], values: Vec<F>) -> Result<Self, ConfigError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or(ConfigError::InvalidArgument {
                arg: "shape",
                reason: "element count overflows usize",
            })?;
        if values.len() != expected {
            return Err(ConfigError::LengthMismatch {
                arg: "values",
                expected,
                got: values.len(),
            });
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), values).map_err(|_| {
            ConfigError::InvalidArgument {
                arg: "shape",
                reason: "shape is incompatible with a row-major buffer",
            }
        })?;
        Self::new(data)
    }
}

impl<F> Signal<F> {
    /// Shape descriptor of the signal.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// Total element count, the product of the shape.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; kept for API symmetry with [`Signal::len`].
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the samples.
    pub fn view(&self) -> ArrayViewD<'_, F> {
        self.data.view()
    }

    /// Borrow the underlying array.
    pub fn as_array(&self) -> &ArrayD<F> {
        &self.data
    }

    /// Give up the underlying array.
    pub fn into_array(self) -> ArrayD<F> {
        self.data
    }

    /// Flattened samples in logical row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.data.iter()
    }
}

impl<F> Signal<F>
where
    F: RelativeEq<Epsilon = F> + Copy,
{
    /// Content equality under the given tolerance.
    ///
    /// Shapes must agree exactly; samples are compared with a relative test
    /// that falls back to an absolute `tolerance` near zero. A tolerance of
    /// zero demands exact equality.
    pub fn content_eq(&self, other: ArrayViewD<'_, F>, tolerance: F) -> bool {
        content_eq(self.view(), other, tolerance)
    }
}

pub(crate) fn content_eq<F>(a: ArrayViewD<'_, F>, b: ArrayViewD<'_, F>, tolerance: F) -> bool
where
    F: RelativeEq<Epsilon = F> + Copy,
{
    a.shape() == b.shape()
        && a
            .iter()
            .zip(b.iter())
            .all(|(x, y)| x.relative_eq(y, tolerance, tolerance))
}
