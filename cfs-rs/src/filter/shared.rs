use super::{FilterTrainer, TrainedFilter, TrainerState};
use crate::kernel::{ConfigError, Rejection, TrainError};
use crate::signal::ReadSignal;
use nalgebra::RealField;
use rustfft::FftNum;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable, lock-guarded handle to one [`FilterTrainer`].
///
/// Every call holds the lock for its whole duration, so the duplicate check
/// and the insert of an add are atomic with respect to concurrent adds.
#[derive(Debug)]
pub struct SharedFilterTrainer<F> {
    inner: Arc<Mutex<FilterTrainer<F>>>,
}

impl<F> Clone for SharedFilterTrainer<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> From<FilterTrainer<F>> for SharedFilterTrainer<F> {
    fn from(trainer: FilterTrainer<F>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(trainer)),
        }
    }
}

impl<F> SharedFilterTrainer<F>
where
    F: RealField + FftNum,
{
    /// Shared trainer with the given trade-off weights.
    pub fn new(alpha: F, beta: F, gamma: F) -> Result<Self, ConfigError> {
        FilterTrainer::new(alpha, beta, gamma).map(Self::from)
    }

    // A panic inside a trainer call cannot leave the sets half-updated, so a
    // poisoned lock is still safe to reuse.
    fn lock(&self) -> MutexGuard<'_, FilterTrainer<F>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// See [`FilterTrainer::add_auth`].
    pub fn add_auth<I>(&self, input: &I) -> bool
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.lock().add_auth(input)
    }

    /// See [`FilterTrainer::add_imp`].
    pub fn add_imp<I>(&self, input: &I) -> bool
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.lock().add_imp(input)
    }

    /// See [`FilterTrainer::try_add_auth`].
    pub fn try_add_auth<I>(&self, input: &I) -> Result<usize, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.lock().try_add_auth(input)
    }

    /// See [`FilterTrainer::try_add_imp`].
    pub fn try_add_imp<I>(&self, input: &I) -> Result<usize, Rejection>
    where
        I: ReadSignal<F> + ?Sized,
    {
        self.lock().try_add_imp(input)
    }

    /// See [`FilterTrainer::set_rank_mode`].
    pub fn set_rank_mode(&self, use_full_rank: bool) {
        self.lock().set_rank_mode(use_full_rank);
    }

    /// See [`FilterTrainer::set_alignment_mode`].
    pub fn set_alignment_mode(&self, centered: bool) {
        self.lock().set_alignment_mode(centered);
    }

    /// Train and return a copy of the new filter.
    pub fn train(&self) -> Result<TrainedFilter<F>, TrainError> {
        self.lock().train().cloned()
    }

    /// See [`FilterTrainer::state`].
    pub fn state(&self) -> TrainerState {
        self.lock().state()
    }

    /// Run `f` with exclusive access to the trainer.
    pub fn with<R>(&self, f: impl FnOnce(&mut FilterTrainer<F>) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_adds_of_the_same_signal_accept_exactly_once() {
        let shared = SharedFilterTrainer::<f64>::new(0.5, 0.5, 0.5).expect("trainer");
        let signal = [3.0f64, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let handles = (0..8)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    if i % 2 == 0 {
                        shared.add_auth(&signal)
                    } else {
                        shared.add_imp(&signal)
                    }
                })
            })
            .collect::<Vec<_>>();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(accepted, 1);
        let total = shared.with(|t| t.authentic().len() + t.impostor().len());
        assert_eq!(total, 1);
    }

    #[test]
    fn train_through_the_handle() {
        let shared = SharedFilterTrainer::<f32>::new(0.5, 0.5, 0.5).expect("trainer");
        assert_eq!(shared.train(), Err(TrainError::NoAuthentic));
        assert!(shared.add_auth(&[1.0f32, 2.0, 0.0, 0.0]));
        let filter = shared.train().expect("train");
        assert_eq!(filter.shape(), &[4]);
        assert_eq!(shared.state(), TrainerState::Trained);
    }
}
