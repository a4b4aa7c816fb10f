use super::{OtsdfConfig, OtsdfKernel, RankMode, TrainedFilter};
use crate::kernel::{validate_non_negative, ConfigError, KernelLifecycle, Rejection, TrainError};
use crate::signal::{Alignment, ReadSignal, Signal};
use crate::traits::FilterSynthesis;
use crate::training::{Class, TrainingSet};
use log::{debug, info};
use nalgebra::RealField;
use rustfft::FftNum;

/// Lifecycle stage of a [`FilterTrainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrainerState {
    /// No signal accepted yet; the canonical shape is unset.
    Unshaped,
    /// Canonical shape fixed, no filter trained yet.
    ShapeEstablished,
    /// The cached filter reflects the current training sets.
    Trained,
    /// Signals were accepted after the last training; the cached filter is
    /// still readable but out of date.
    Stale,
}

/// Accumulates authentic and impostor examples and synthesizes an OTSDF
/// correlation filter from them.
///
/// ```
/// use cfs_rs::filter::FilterTrainer;
///
/// let mut trainer = FilterTrainer::<f32>::new(1e-5, 1.0 - 1e-5, 0.5).unwrap();
/// let truesig = [0.0f32, 0., 0., 0., 0., 1., 1., 1., 1., 1., 0., 0., 0., 0., 0.];
///
/// assert!(trainer.add_auth(&truesig));
/// assert!(!trainer.add_auth(&truesig));
/// assert!(!trainer.add_imp(&truesig));
///
/// let filter = trainer.train().unwrap();
/// assert_eq!(filter.shape(), &[15]);
/// ```
#[derive(Debug, Clone)]
pub struct FilterTrainer<F> {
    kernel: OtsdfKernel<F>,
    config: OtsdfConfig<F>,
    rank_mode: RankMode,
    alignment: Alignment,
    canonical: Option<Vec<usize>>,
    authentic: TrainingSet<F>,
    impostor: TrainingSet<F>,
    trained: Option<TrainedFilter<F>>,
    stale: bool,
}

impl<F> KernelLifecycle for FilterTrainer<F>
where
    F: RealField + FftNum,
{
    type Config = OtsdfConfig<F>;

    fn try_new(config: Self::Config) -> Result<Self, ConfigError> {
        let kernel = OtsdfKernel::try_new(config)?;
        validate_non_negative("match_tolerance", config.match_tolerance)?;
        Ok(Self {
            kernel,
            config,
            rank_mode: config.rank_mode,
            alignment: config.alignment,
            canonical: None,
            authentic: TrainingSet::new(Class::Authentic),
            impostor: TrainingSet::new(Class::Impostor),
            trained: None,
            stale: false,
        })
    }
}

impl<F> FilterTrainer<F>
where
    F: RealField + FftNum,
{
    /// Trainer with trade-off weights `alpha`, `beta` and noise weight
    /// `gamma`, full-rank synthesis and origin alignment.
    pub fn new(alpha: F, beta: F, gamma: F) -> Result<Self, ConfigError> {
        Self::try_new(OtsdfConfig::new(alpha, beta, gamma))
    }

    /// Configuration the trainer was built from.
    pub fn config(&self) -> &OtsdfConfig<F> {
        &self.config
    }

    /// Choose full-rank (`true`) or reduced-rank (`false`) synthesis for the
    /// next [`train`](Self::train).
    pub fn set_rank_mode(&mut self, use_full_rank: bool) {
        self.rank_mode = RankMode::from_full_rank(use_full_rank);
    }

    /// Rank mode the next [`train`](Self::train) will use.
    pub fn rank_mode(&self) -> RankMode {
        self.rank_mode
    }

    /// Choose centered (`true`) or origin (`false`) alignment for later adds.
    /// Stored signals are not revisited.
    pub fn set_alignment_mode(&mut self, centered: bool) {
        self.alignment = Alignment::from_centered(centered);
    }

    /// Alignment applied to the next add.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Shape fixed by the first accepted signal.
    pub fn canonical_shape(&self) -> Option<&[usize]> {
        self.canonical.as_deref()
    }

    /// Accepted authentic examples.
    pub fn authentic(&self) -> &TrainingSet<F> {
        &self.authentic
    }

    /// Accepted impostor examples.
    pub fn impostor(&self) -> &TrainingSet<F> {
        &self.impostor
    }

    /// Most recent successfully trained filter, possibly stale.
    pub fn trained(&self) -> Option<&TrainedFilter<F>> {
        self.trained.as_ref()
    }

    /// True when signals were accepted after the last successful training.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Current lifecycle stage.
    pub fn state(&self) -> TrainerState {
        match (&self.canonical, &self.trained) {
            (None, _) => TrainerState::Unshaped,
            (Some(_), None) => TrainerState::ShapeEstablished,
            (Some(_), Some(_)) if self.stale => TrainerState::Stale,
            (Some(_), Some(_)) => TrainerState::Trained,
        }
    }

    /// Add an authentic example; false if it was rejected.
    pub fn add_auth<I>(&mut self, input: &I) -> bool
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.try_add_auth(input).is_ok()
    }

    /// Add an impostor example; false if it was rejected.
    pub fn add_imp<I>(&mut self, input: &I) -> bool
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.try_add_imp(input).is_ok()
    }

    /// Add an authentic example, returning its index in the authentic set.
    pub fn try_add_auth<I>(&mut self, input: &I) -> Result<usize, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.try_add(Class::Authentic, input)
    }

    /// Add an impostor example, returning its index in the impostor set.
    pub fn try_add_imp<I>(&mut self, input: &I) -> Result<usize, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.try_add(Class::Impostor, input)
    }

    fn try_add<I>(&mut self, class: Class, input: &I) -> Result<usize, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        let signal = input.read_signal().inspect_err(|err| {
            debug!("rejected {class} signal: {err}");
        })?;

        let Some(canonical) = self.canonical.as_deref() else {
            info!("canonical shape set to {:?} by {class} signal", signal.shape());
            self.canonical = Some(signal.shape().to_vec());
            return Ok(self.accept(class, signal));
        };

        let aligned = self
            .alignment
            .crop(signal.view(), canonical)
            .inspect_err(|err| debug!("rejected {class} signal: {err}"))?;
        let tolerance = self.config.match_tolerance;
        for set in [&self.authentic, &self.impostor] {
            if let Some(index) = set.position(aligned.view(), tolerance) {
                let rejection = Rejection::Duplicate {
                    class: set.class(),
                    index,
                };
                debug!("rejected {class} signal: {rejection}");
                return Err(rejection);
            }
        }
        let aligned = Signal::new(aligned.to_owned())?;
        Ok(self.accept(class, aligned))
    }

    fn accept(&mut self, class: Class, signal: Signal<F>) -> usize {
        let set = match class {
            Class::Authentic => &mut self.authentic,
            Class::Impostor => &mut self.impostor,
        };
        let index = set.insert(signal);
        if self.trained.is_some() {
            self.stale = true;
        }
        debug!("accepted {class} signal #{index}");
        index
    }

    /// Synthesize the filter from the current training sets.
    ///
    /// On success the result is cached and returned; on failure the training
    /// sets and any earlier filter are left as they were.
    pub fn train(&mut self) -> Result<&TrainedFilter<F>, TrainError> {
        let filter = self
            .kernel
            .run(&self.authentic, &self.impostor, self.rank_mode)?;
        self.stale = false;
        Ok(self.trained.insert(filter))
    }
}
