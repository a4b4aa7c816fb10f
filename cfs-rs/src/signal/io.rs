use super::Signal;
use crate::kernel::ConfigError;
use nalgebra::RealField;
use ndarray::{Array1, ArrayBase, Data, Dimension};
use num_traits::AsPrimitive;

/// Adapter trait for reading caller data into an owned [`Signal`].
///
/// Reading always copies, so mutating the source afterwards has no effect on
/// anything the trainer stored. Element types are converted with `as`
/// semantics, which lets integer images feed a floating-point trainer.
pub trait ReadSignal<F> {
    /// Copy the input into a signal of the common real type `F`.
    fn read_signal(&self) -> Result<Signal<F>, ConfigError>;
}

impl<F> ReadSignal<F> for Signal<F>
where
    F: Clone,
{
    fn read_signal(&self) -> Result<Signal<F>, ConfigError> {
        Ok(self.clone())
    }
}

impl<F, S, D> ReadSignal<F> for ArrayBase<S, D>
where
    F: RealField + Copy,
    S: Data,
    S::Elem: AsPrimitive<F>,
    D: Dimension,
{
    fn read_signal(&self) -> Result<Signal<F>, ConfigError> {
        Signal::new(self.mapv(|v| v.as_()).into_dyn())
    }
}

impl<F, T> ReadSignal<F> for [T]
where
    F: RealField + Copy,
    T: AsPrimitive<F>,
{
    fn read_signal(&self) -> Result<Signal<F>, ConfigError> {
        Signal::new(Array1::from_iter(self.iter().map(|v| v.as_())).into_dyn())
    }
}

impl<F, T, const N: usize> ReadSignal<F> for [T; N]
where
    F: RealField + Copy,
    T: AsPrimitive<F>,
{
    fn read_signal(&self) -> Result<Signal<F>, ConfigError> {
        self.as_slice().read_signal()
    }
}

impl<F, T> ReadSignal<F> for Vec<T>
where
    F: RealField + Copy,
    T: AsPrimitive<F>,
{
    fn read_signal(&self) -> Result<Signal<F>, ConfigError> {
        self.as_slice().read_signal()
    }
}
