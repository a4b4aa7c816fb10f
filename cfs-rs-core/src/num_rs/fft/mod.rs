use crate::{Error, Result};
use ndarray::{ArrayBase, ArrayD, Axis, Data, Dimension};
use num_traits::Zero;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftNum, FftPlanner};

/// Multi-dimensional discrete Fourier transform of a real array.
///
/// Transforms along every axis in turn, like `numpy.fft.fftn` with default
/// arguments. The output is unnormalized and has the same shape as `x`.
///
/// # Errors
/// Returns [`Error::InvalidArg`] when `x` has no elements.
///
/// # Examples
/// ```
/// use approx::assert_relative_eq;
/// use ndarray::array;
/// use cfs_rs_core::num_rs::fftn;
///
/// let x = array![[1., 2.], [3., 4.]];
/// let y = fftn(&x).unwrap();
/// assert_relative_eq!(y[[0, 0]].re, 10.);
/// assert_relative_eq!(y[[0, 1]].re, -2.);
/// assert_relative_eq!(y[[1, 0]].re, -4.);
/// assert_relative_eq!(y[[1, 1]].re, 0.);
/// ```
pub fn fftn<F, S, D>(x: &ArrayBase<S, D>) -> Result<ArrayD<Complex<F>>>
where
    F: FftNum,
    S: Data<Elem = F>,
    D: Dimension,
{
    ensure_non_empty(x.len(), "x")?;
    let mut out = x.mapv(|v| Complex::new(v, F::zero())).into_dyn();
    transform_axes(&mut out, FftDirection::Forward);
    Ok(out)
}

/// Inverse of [`fftn`], scaled by `1 / x.len()` so that `ifftn(fftn(x)) == x`.
///
/// # Errors
/// Returns [`Error::InvalidArg`] when `x` has no elements.
pub fn ifftn<F>(x: &ArrayD<Complex<F>>) -> Result<ArrayD<Complex<F>>>
where
    F: FftNum,
{
    ensure_non_empty(x.len(), "x")?;
    let scale = F::from_usize(x.len()).ok_or_else(|| Error::InvalidArg {
        arg: "x".to_string(),
        reason: "element count is not representable in the scalar type".to_string(),
    })?;
    let mut out = x.clone();
    transform_axes(&mut out, FftDirection::Inverse);
    out.mapv_inplace(|v| v / scale);
    Ok(out)
}

/// Real part of [`ifftn`], for spectra known to be conjugate symmetric.
///
/// # Errors
/// Returns [`Error::InvalidArg`] when `x` has no elements.
pub fn ifftn_real<F>(x: &ArrayD<Complex<F>>) -> Result<ArrayD<F>>
where
    F: FftNum,
{
    Ok(ifftn(x)?.mapv(|v| v.re))
}

fn ensure_non_empty(len: usize, arg: &str) -> Result<()> {
    if len == 0 {
        return Err(Error::InvalidArg {
            arg: arg.to_string(),
            reason: "transform input must be non-empty".to_string(),
        });
    }
    Ok(())
}

fn transform_axes<F: FftNum>(x: &mut ArrayD<Complex<F>>, direction: FftDirection) {
    let mut planner = FftPlanner::<F>::new();
    for axis in 0..x.ndim() {
        let n = x.len_of(Axis(axis));
        if n < 2 {
            continue;
        }
        let fft = planner.plan_fft(n, direction);
        let mut scratch = vec![Complex::zero(); fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex::zero(); n];
        for mut lane in x.lanes_mut(Axis(axis)) {
            buffer.iter_mut().zip(lane.iter()).for_each(|(b, v)| *b = *v);
            fft.process_with_scratch(&mut buffer, &mut scratch);
            lane.iter_mut().zip(buffer.iter()).for_each(|(v, b)| *v = *b);
        }
    }
}
