//! Optimal trade-off synthetic discriminant function (OTSDF) synthesis.
//!
//! The filter `H` minimizes `Hᴴ T H` subject to a unit correlation peak on
//! every authentic example and a zero peak on every impostor, where
//!
//! ```text
//! T(k) = alpha * D_auth(k) + beta * D_imp(k) + gamma
//! ```
//!
//! is diagonal in the frequency domain (`D_*` are class-average power
//! spectra). The closed form is `H = T⁻¹ X (Xᴴ T⁻¹ X)⁻¹ d·u`.

use super::{FilterDiagnostics, OtsdfConfig, RankMode, TrainedFilter};
use crate::kernel::{validate_non_negative, ConfigError, KernelLifecycle, TrainError};
use crate::traits::FilterSynthesis;
use crate::training::TrainingSet;
use cfs_rs_core::num_rs::{fftn, ifftn_real};
use itertools::izip;
use log::{debug, info, warn};
use nalgebra::{convert, Complex, DMatrix, DVector, RealField, SymmetricEigen};
use ndarray::{ArrayD, Dimension, IxDyn, Zip};
use num_traits::{One, Zero};
use rustfft::FftNum;

/// Validated OTSDF synthesis kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsdfKernel<F> {
    alpha: F,
    beta: F,
    gamma: F,
    rank_tolerance: F,
}

impl<F> OtsdfKernel<F>
where
    F: RealField + Copy,
{
    /// Weight on the authentic power spectrum.
    pub fn alpha(&self) -> F {
        self.alpha
    }

    /// Weight on the impostor power spectrum.
    pub fn beta(&self) -> F {
        self.beta
    }

    /// Weight on the white-noise regularizer.
    pub fn gamma(&self) -> F {
        self.gamma
    }

    /// Relative eigenvalue cutoff of reduced-rank solves.
    pub fn rank_tolerance(&self) -> F {
        self.rank_tolerance
    }
}

impl<F> KernelLifecycle for OtsdfKernel<F>
where
    F: RealField + Copy,
{
    type Config = OtsdfConfig<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        validate_non_negative("alpha", config.alpha)?;
        validate_non_negative("beta", config.beta)?;
        validate_non_negative("gamma", config.gamma)?;
        validate_non_negative("rank_tolerance", config.rank_tolerance)?;
        if config.rank_tolerance >= F::one() {
            return Err(ConfigError::InvalidArgument {
                arg: "rank_tolerance",
                reason: "must be less than one",
            });
        }
        Ok(Self {
            alpha: config.alpha,
            beta: config.beta,
            gamma: config.gamma,
            rank_tolerance: config.rank_tolerance,
        })
    }
}

impl<F> FilterSynthesis<F> for OtsdfKernel<F>
where
    F: RealField + FftNum,
{
    fn run(
        &self,
        authentic: &TrainingSet<F>,
        impostor: &TrainingSet<F>,
        rank_mode: RankMode,
    ) -> Result<TrainedFilter<F>, TrainError> {
        if authentic.is_empty() {
            return Err(TrainError::NoAuthentic);
        }
        let spectra = authentic
            .iter()
            .chain(impostor.iter())
            .map(|s| fftn(s.as_array()))
            .collect::<Result<Vec<_>, _>>()?;
        let shape = spectra[0].raw_dim();
        let (auth_spectra, imp_spectra) = spectra.split_at(authentic.len());
        let auth_power = mean_power(auth_spectra, &shape);
        let imp_power = mean_power(imp_spectra, &shape);
        let operator = self.operator(&auth_power, &imp_power)?;

        let n = spectra.len();
        let mut gram = DMatrix::<Complex<F>>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let g = weighted_inner(&spectra[i], &spectra[j], &operator);
                gram[(i, j)] = g;
                gram[(j, i)] = g.conj();
            }
        }

        let dim: F = convert(shape.size() as f64);
        let peaks = DVector::from_fn(n, |i, _| {
            if i < authentic.len() {
                Complex::new(dim, F::zero())
            } else {
                Complex::zero()
            }
        });
        debug!(
            "solving {rank_mode} otsdf system: {} authentic, {} impostor, {} bins",
            authentic.len(),
            impostor.len(),
            shape.size()
        );
        let (weights, rank) = match rank_mode {
            RankMode::Full => solve_full(gram, &peaks, shape.size())?,
            RankMode::Reduced => solve_pseudo_inverse(gram, &peaks, self.rank_tolerance)?,
        };

        let mut response = ArrayD::<Complex<F>>::zeros(shape.clone());
        for (c, x) in weights.iter().zip(spectra.iter()) {
            Zip::from(&mut response)
                .and(x)
                .for_each(|h, &xk| *h += xk * *c);
        }
        Zip::from(&mut response)
            .and(&operator)
            .for_each(|h, &t| *h = *h / t);
        let coefficients = ifftn_real(&response)?;
        if !coefficients.iter().all(|h| h.is_finite()) {
            warn!("otsdf synthesis produced non-finite coefficients");
            return Err(TrainError::IllConditioned {
                reason: "synthesized filter is not finite",
            });
        }

        let mut ace = F::zero();
        let mut ice = F::zero();
        let mut onv = F::zero();
        for (h, &a, &m) in izip!(response.iter(), auth_power.iter(), imp_power.iter()) {
            let energy = h.norm_sqr();
            ace += a * energy;
            ice += m * energy;
            onv += energy;
        }
        let diagnostics = FilterDiagnostics {
            rank,
            constraints: n,
            rank_mode,
            average_correlation_energy: ace / dim,
            impostor_correlation_energy: ice / dim,
            output_noise_variance: onv / dim,
        };
        info!(
            "trained {rank_mode} filter over {:?}: rank {rank}/{n}, ace {}, onv {}",
            shape.slice(),
            diagnostics.average_correlation_energy,
            diagnostics.output_noise_variance
        );
        Ok(TrainedFilter::new(coefficients, response, diagnostics))
    }
}

impl<F> OtsdfKernel<F>
where
    F: RealField + FftNum,
{
    /// Diagonal of the regularized operator `T`.
    ///
    /// Every bin must be finite and strictly positive. With `gamma > 0` that
    /// holds whenever the power spectra are finite; without the noise floor a
    /// bin is also singular when it falls to rounding level relative to the
    /// strongest bin.
    fn operator(
        &self,
        auth_power: &ArrayD<F>,
        imp_power: &ArrayD<F>,
    ) -> Result<ArrayD<F>, TrainError> {
        let operator = Zip::from(auth_power)
            .and(imp_power)
            .map_collect(|&a, &m| self.alpha * a + self.beta * m + self.gamma);
        if !operator.iter().all(|t| t.is_finite()) {
            warn!("otsdf operator overflowed; training signals are too large");
            return Err(TrainError::IllConditioned {
                reason: "regularized operator is not finite",
            });
        }
        let largest = operator.iter().fold(F::zero(), |acc, &t| acc.max(t));
        if !(largest > F::zero()) {
            warn!("otsdf operator vanishes at every frequency");
            return Err(TrainError::IllConditioned {
                reason: "regularized operator vanishes",
            });
        }
        let floor = if self.gamma > F::zero() {
            F::zero()
        } else {
            largest * F::default_epsilon()
        };
        if operator.iter().any(|&t| !(t > floor)) {
            warn!(
                "otsdf operator is singular at some frequency, gamma = {}",
                self.gamma
            );
            return Err(TrainError::IllConditioned {
                reason: "regularized operator is singular at some frequency",
            });
        }
        Ok(operator)
    }
}

/// Class-average power spectrum; all zeros for an empty class.
fn mean_power<F>(spectra: &[ArrayD<Complex<F>>], shape: &IxDyn) -> ArrayD<F>
where
    F: RealField + FftNum,
{
    let mut power = ArrayD::<F>::zeros(shape.clone());
    if spectra.is_empty() {
        return power;
    }
    for x in spectra {
        Zip::from(&mut power)
            .and(x)
            .for_each(|p, xk| *p += xk.norm_sqr());
    }
    let count: F = convert(spectra.len() as f64);
    power.mapv_inplace(|p| p / count);
    power
}

/// `Σ_k conj(a_k) b_k / t_k`.
fn weighted_inner<F>(a: &ArrayD<Complex<F>>, b: &ArrayD<Complex<F>>, t: &ArrayD<F>) -> Complex<F>
where
    F: RealField + FftNum,
{
    izip!(a.iter(), b.iter(), t.iter()).fold(Complex::zero(), |acc, (x, y, &w)| {
        acc + x.conj() * *y / w
    })
}

/// Cholesky solve of the full constraint system.
///
/// When the examples are linearly dependent (always the case with more
/// examples than bins) the solve falls back to the minimum-norm solution
/// that drops only the numerically null directions of the Gram matrix. The
/// null threshold `n * bins * eps` bounds the rounding accumulated while
/// forming and factoring the Gram sums.
fn solve_full<F>(
    gram: DMatrix<Complex<F>>,
    peaks: &DVector<Complex<F>>,
    bins: usize,
) -> Result<(DVector<Complex<F>>, usize), TrainError>
where
    F: RealField + FftNum,
{
    let n = peaks.len();
    let null_tolerance = F::default_epsilon() * convert::<f64, F>((n * bins) as f64);
    if let Some(chol) = gram.clone().cholesky() {
        let pivots = chol
            .l_dirty()
            .diagonal()
            .iter()
            .map(|p| p.norm_sqr())
            .collect::<Vec<_>>();
        let (lo, hi) = pivots
            .iter()
            .fold((pivots[0], pivots[0]), |(lo, hi), &p| (lo.min(p), hi.max(p)));
        if lo > hi * null_tolerance {
            return Ok((chol.solve(peaks), n));
        }
    }
    debug!("otsdf gram matrix is rank deficient; using the minimum-norm solve");
    solve_pseudo_inverse(gram, peaks, null_tolerance)
}

/// `V_r Λ_r⁻¹ V_rᴴ peaks` over the eigenpairs with `λ > tolerance · λ_max`.
fn solve_pseudo_inverse<F>(
    gram: DMatrix<Complex<F>>,
    peaks: &DVector<Complex<F>>,
    tolerance: F,
) -> Result<(DVector<Complex<F>>, usize), TrainError>
where
    F: RealField + FftNum,
{
    let eig = SymmetricEigen::new(gram);
    let largest = eig
        .eigenvalues
        .iter()
        .fold(F::zero(), |acc, &l| acc.max(l));
    let cutoff = largest * tolerance;
    let mut weights = DVector::<Complex<F>>::zeros(peaks.len());
    let mut rank = 0;
    for (k, &lambda) in eig.eigenvalues.iter().enumerate() {
        if !(lambda > cutoff) || !(lambda > F::zero()) {
            continue;
        }
        let v = eig.eigenvectors.column(k);
        let proj = v.dotc(peaks) / lambda;
        weights.axpy(proj, &v, Complex::one());
        rank += 1;
    }
    if rank == 0 {
        warn!("otsdf constraint solve kept no eigenpairs");
        return Err(TrainError::IllConditioned {
            reason: "constraint gram matrix has no usable spectrum",
        });
    }
    debug!("constraint solve kept {rank} of {} eigenpairs", peaks.len());
    Ok((weights, rank))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{ReadSignal, Signal};
    use crate::training::Class;
    use approx::assert_relative_eq;

    fn set(class: Class, rows: &[&[f64]]) -> TrainingSet<f64> {
        let mut set = TrainingSet::new(class);
        for row in rows {
            set.insert(row.read_signal().expect("signal"));
        }
        set
    }

    fn kernel(alpha: f64, beta: f64, gamma: f64) -> OtsdfKernel<f64> {
        OtsdfKernel::try_new(OtsdfConfig::new(alpha, beta, gamma)).expect("valid config")
    }

    const A0: [f64; 8] = [0., 1., 3., 1., 0., 0., 0., 0.];
    const A1: [f64; 8] = [0., 2., 3., 0., 0., 1., 0., 0.];
    const M0: [f64; 8] = [1., 0., 0., 2., 0., 0., 4., 0.];

    #[test]
    fn rejects_invalid_config() {
        let err = OtsdfKernel::try_new(OtsdfConfig::new(-1.0f64, 0.5, 0.5)).expect_err("alpha");
        assert_eq!(
            err,
            ConfigError::InvalidArgument {
                arg: "alpha",
                reason: "must be non-negative",
            }
        );
        let mut config = OtsdfConfig::new(0.5f64, 0.5, 0.5);
        config.rank_tolerance = 1.0;
        assert!(OtsdfKernel::try_new(config).is_err());
    }

    #[test]
    fn peaks_meet_constraints() {
        let auth = set(Class::Authentic, &[&A0, &A1]);
        let imp = set(Class::Impostor, &[&M0]);
        let filter = kernel(0.3, 0.6, 0.1)
            .run(&auth, &imp, RankMode::Full)
            .expect("train");

        assert_eq!(filter.shape(), &[8]);
        assert_eq!(filter.rank(), 3);
        assert_eq!(filter.diagnostics().constraints, 3);
        assert_relative_eq!(filter.peak_response(&A0).expect("a0"), 1.0, epsilon = 1e-9);
        assert_relative_eq!(filter.peak_response(&A1).expect("a1"), 1.0, epsilon = 1e-9);
        assert_relative_eq!(filter.peak_response(&M0).expect("m0"), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn reduced_rank_agrees_with_full_rank_on_independent_examples() {
        let auth = set(Class::Authentic, &[&A0, &A1]);
        let imp = set(Class::Impostor, &[&M0]);
        let k = kernel(0.3, 0.6, 0.1);
        let full = k.run(&auth, &imp, RankMode::Full).expect("full");
        let reduced = k.run(&auth, &imp, RankMode::Reduced).expect("reduced");
        assert_eq!(reduced.rank(), 3);
        full.coefficients()
            .iter()
            .zip(reduced.coefficients().iter())
            .for_each(|(a, b)| assert_relative_eq!(*a, *b, epsilon = 1e-9));
    }

    #[test]
    fn coefficients_match_spectrum() {
        let auth = set(Class::Authentic, &[&A0]);
        let imp = set(Class::Impostor, &[]);
        let filter = kernel(1e-5, 1.0 - 1e-5, 0.5)
            .run(&auth, &imp, RankMode::Full)
            .expect("train");
        let back = fftn(filter.coefficients()).expect("fft");
        back.iter()
            .zip(filter.spectrum().iter())
            .for_each(|(a, b)| {
                assert_relative_eq!(a.re, b.re, epsilon = 1e-10);
                assert_relative_eq!(a.im, b.im, epsilon = 1e-10);
            });
        let onv: f64 = filter.coefficients().iter().map(|h| h * h).sum();
        assert_relative_eq!(filter.diagnostics().output_noise_variance, onv, epsilon = 1e-10);
        assert_eq!(filter.diagnostics().impostor_correlation_energy, 0.0);
    }

    #[test]
    fn dependent_examples_get_the_minimum_norm_filter() {
        let doubled = A0.map(|v| 2.0 * v);
        let auth = set(Class::Authentic, &[&A0, &doubled]);
        let imp = set(Class::Impostor, &[]);
        let k = kernel(0.5, 0.5, 0.5);

        // Least-squares compromise between peak 1 on x and peak 1 on 2x.
        for mode in [RankMode::Full, RankMode::Reduced] {
            let filter = k.run(&auth, &imp, mode).expect("dependent examples");
            assert_eq!(filter.rank(), 1);
            assert_eq!(filter.diagnostics().constraints, 2);
            assert_relative_eq!(filter.peak_response(&A0).expect("x"), 0.6, epsilon = 1e-9);
            assert_relative_eq!(
                filter.peak_response(&doubled).expect("2x"),
                1.2,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn more_examples_than_samples_trains_in_full_mode() {
        let auth = set(
            Class::Authentic,
            &[
                &[1., 0., 0., 0.],
                &[0., 1., 0., 0.],
                &[0., 0., 1., 0.],
                &[0., 0., 0., 1.],
                &[1., 1., 1., 1.],
            ],
        );
        let imp = set(Class::Impostor, &[]);
        let filter = kernel(0.5, 0.5, 0.5)
            .run(&auth, &imp, RankMode::Full)
            .expect("n > d");
        assert_eq!(filter.rank(), 4);
        assert_eq!(filter.diagnostics().constraints, 5);
        assert!(filter.coefficients().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn realistic_images_train_with_a_noise_floor() {
        let image = |seed: usize| {
            ndarray::Array2::from_shape_fn((64, 64), |(i, j)| {
                (200 + (i * 7 + j * 13 + seed * 5 + i * j % 11) % 51) as u8
            })
        };
        let target = image(1);
        let clutter = image(2);

        let mut auth = TrainingSet::<f64>::new(Class::Authentic);
        auth.insert(target.read_signal().expect("target"));
        let mut imp = TrainingSet::<f64>::new(Class::Impostor);
        imp.insert(clutter.read_signal().expect("clutter"));
        let filter = kernel(1e-5, 1.0 - 1e-5, 0.5)
            .run(&auth, &imp, RankMode::Full)
            .expect("f64 images");
        assert_eq!(filter.rank(), 2);
        assert_relative_eq!(filter.peak_response(&target).expect("target"), 1.0, epsilon = 1e-6);
        assert_relative_eq!(filter.peak_response(&clutter).expect("clutter"), 0.0, epsilon = 1e-6);

        let mut auth = TrainingSet::<f32>::new(Class::Authentic);
        auth.insert(target.read_signal().expect("target"));
        let mut imp = TrainingSet::<f32>::new(Class::Impostor);
        imp.insert(clutter.read_signal().expect("clutter"));
        let k = OtsdfKernel::try_new(OtsdfConfig::new(1e-5f32, 1.0 - 1e-5, 0.5)).expect("config");
        assert!(k.run(&auth, &imp, RankMode::Full).is_ok());
    }

    #[test]
    fn overflowing_power_spectrum_is_ill_conditioned() {
        let mut auth = TrainingSet::<f32>::new(Class::Authentic);
        auth.insert([1e30f32, 2e30, 3e30, 4e30].read_signal().expect("finite"));
        let imp = TrainingSet::<f32>::new(Class::Impostor);
        let k = OtsdfKernel::try_new(OtsdfConfig::new(0.5f32, 0.5, 0.5)).expect("config");
        assert_eq!(
            k.run(&auth, &imp, RankMode::Full),
            Err(TrainError::IllConditioned {
                reason: "regularized operator is not finite",
            })
        );
    }

    #[test]
    fn spectral_nulls_without_noise_floor_are_ill_conditioned() {
        let boxcar = [0., 0., 0., 0., 0., 1., 1., 1., 1., 1., 0., 0., 0., 0., 0.];
        let auth = set(Class::Authentic, &[&boxcar]);
        let imp = set(Class::Impostor, &[]);
        let err = kernel(1e-5, 1.0 - 1e-5, 0.0)
            .run(&auth, &imp, RankMode::Full)
            .expect_err("nulls");
        assert_eq!(
            err,
            TrainError::IllConditioned {
                reason: "regularized operator is singular at some frequency",
            }
        );

        let filter = kernel(1e-5, 1.0 - 1e-5, 0.5)
            .run(&auth, &imp, RankMode::Full)
            .expect("regularized");
        assert_relative_eq!(filter.peak_response(&boxcar).expect("peak"), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_authentic_set_is_a_precondition_failure() {
        let auth = TrainingSet::<f64>::new(Class::Authentic);
        let imp = set(Class::Impostor, &[&M0]);
        assert_eq!(
            kernel(0.5, 0.5, 0.5).run(&auth, &imp, RankMode::Full),
            Err(TrainError::NoAuthentic)
        );
    }

    #[test]
    fn two_dimensional_peaks() {
        let mut auth = TrainingSet::<f32>::new(Class::Authentic);
        let img: Signal<f32> = ndarray::array![[0u8, 9, 3], [4, 4, 0], [1, 0, 7], [2, 5, 5]]
            .read_signal()
            .expect("image");
        auth.insert(img.clone());
        let imp = TrainingSet::<f32>::new(Class::Impostor);
        let k = OtsdfKernel::try_new(OtsdfConfig::new(0.5f32, 0.5, 0.5)).expect("config");
        let filter = k.run(&auth, &imp, RankMode::Full).expect("train");
        assert_eq!(filter.shape(), &[4, 3]);
        assert_relative_eq!(filter.peak_response(&img).expect("peak"), 1.0, epsilon = 1e-4);
    }
}
