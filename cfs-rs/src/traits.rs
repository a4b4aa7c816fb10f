//! Trait interfaces for filter-synthesis capabilities.

use crate::filter::{RankMode, TrainedFilter};
use crate::kernel::TrainError;
use crate::training::TrainingSet;

/// Correlation filter synthesis from labelled training sets.
///
/// Implementations must be deterministic: equal sets and mode give equal
/// filters.
pub trait FilterSynthesis<F> {
    /// Synthesize a filter from the authentic and impostor examples.
    fn run(
        &self,
        authentic: &TrainingSet<F>,
        impostor: &TrainingSet<F>,
        rank_mode: RankMode,
    ) -> Result<TrainedFilter<F>, TrainError>;
}
