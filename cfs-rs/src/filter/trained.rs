use super::RankMode;
use crate::kernel::Rejection;
use crate::signal::ReadSignal;
use nalgebra::{Complex, RealField};
use ndarray::ArrayD;

/// Scalar summaries of a synthesized filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterDiagnostics<F> {
    /// Number of independent constraints the solve honoured.
    pub rank: usize,
    /// Number of constraints posed (authentic plus impostor examples).
    pub constraints: usize,
    /// Mode the filter was synthesized in.
    pub rank_mode: RankMode,
    /// Correlation-plane energy averaged over the authentic examples.
    pub average_correlation_energy: F,
    /// Correlation-plane energy averaged over the impostor examples; zero
    /// without impostors.
    pub impostor_correlation_energy: F,
    /// Output variance under unit white noise, the squared norm of the
    /// coefficients.
    pub output_noise_variance: F,
}

/// Coefficients produced by one synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedFilter<F> {
    coefficients: ArrayD<F>,
    spectrum: ArrayD<Complex<F>>,
    diagnostics: FilterDiagnostics<F>,
}

impl<F> TrainedFilter<F>
where
    F: RealField + Copy,
{
    pub(crate) fn new(
        coefficients: ArrayD<F>,
        spectrum: ArrayD<Complex<F>>,
        diagnostics: FilterDiagnostics<F>,
    ) -> Self {
        Self {
            coefficients,
            spectrum,
            diagnostics,
        }
    }

    /// Real spatial-domain coefficients in the canonical shape.
    pub fn coefficients(&self) -> &ArrayD<F> {
        &self.coefficients
    }

    /// Unnormalized frequency response, the N-D DFT of the coefficients.
    pub fn spectrum(&self) -> &ArrayD<Complex<F>> {
        &self.spectrum
    }

    /// Canonical shape the filter was trained in.
    pub fn shape(&self) -> &[usize] {
        self.coefficients.shape()
    }

    /// Achieved rank of the constraint solve.
    pub fn rank(&self) -> usize {
        self.diagnostics.rank
    }

    /// Rank, constraint count and correlation energies of the synthesis.
    pub fn diagnostics(&self) -> &FilterDiagnostics<F> {
        &self.diagnostics
    }

    /// Give up the coefficient array.
    pub fn into_coefficients(self) -> ArrayD<F> {
        self.coefficients
    }

    /// Correlation output at zero shift: the inner product of the
    /// coefficients with `input`.
    ///
    /// Training constrains this to one for every authentic example and to zero
    /// for every impostor. `input` must already be in the canonical shape.
    pub fn peak_response<I>(&self, input: &I) -> Result<F, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        let signal = input.read_signal()?;
        if signal.shape() != self.shape() {
            return Err(Rejection::ShapeInfeasible {
                expected: self.shape().to_vec(),
                got: signal.shape().to_vec(),
            });
        }
        Ok(self
            .coefficients
            .iter()
            .zip(signal.iter())
            .fold(F::zero(), |acc, (h, x)| acc + *h * *x))
    }
}
