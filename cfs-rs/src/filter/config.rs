use crate::signal::Alignment;
use core::fmt;
use nalgebra::RealField;

/// Subspace in which synthesis solves the constraint system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RankMode {
    /// Solve the full constraint system. Linearly dependent examples fall
    /// back to the minimum-norm solution and lower the reported rank.
    #[default]
    Full,
    /// Solve in the subspace of eigenpairs above `rank_tolerance`, an economy
    /// approximation that may drop weak but independent examples.
    Reduced,
}

impl RankMode {
    /// Rank mode for the `use_full_rank` flag of
    /// [`FilterTrainer::set_rank_mode`](super::FilterTrainer::set_rank_mode).
    pub fn from_full_rank(use_full_rank: bool) -> Self {
        if use_full_rank {
            RankMode::Full
        } else {
            RankMode::Reduced
        }
    }
}

impl fmt::Display for RankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankMode::Full => write!(f, "full-rank"),
            RankMode::Reduced => write!(f, "reduced-rank"),
        }
    }
}

/// Constructor config for [`OtsdfKernel`](super::OtsdfKernel) and
/// [`FilterTrainer`](super::FilterTrainer).
///
/// `alpha`, `beta` and `gamma` weight the authentic power spectrum, the
/// impostor power spectrum and a white-noise floor in the regularized
/// operator. They are fixed for the lifetime of a trainer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtsdfConfig<F> {
    /// Weight on the authentic-class average power spectrum.
    pub alpha: F,
    /// Weight on the impostor-class average power spectrum.
    pub beta: F,
    /// Weight on the white-noise regularizer.
    pub gamma: F,
    /// Initial rank mode.
    pub rank_mode: RankMode,
    /// Initial alignment policy.
    pub alignment: Alignment,
    /// Per-sample tolerance of duplicate detection; zero means exact.
    pub match_tolerance: F,
    /// Relative eigenvalue cutoff of [`RankMode::Reduced`]: each kept
    /// eigenvalue must exceed `rank_tolerance` times the largest. Must lie in
    /// `[0, 1)`.
    pub rank_tolerance: F,
}

impl<F> OtsdfConfig<F>
where
    F: RealField + Copy,
{
    /// Config with the given trade-off weights and default modes and
    /// tolerances.
    pub fn new(alpha: F, beta: F, gamma: F) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            rank_mode: RankMode::default(),
            alignment: Alignment::default(),
            match_tolerance: F::default_epsilon(),
            rank_tolerance: F::default_epsilon().sqrt(),
        }
    }
}
