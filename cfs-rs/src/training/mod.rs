//! Per-class collections of accepted training signals.

use crate::signal::{content_eq, Signal};
use approx::RelativeEq;
use core::fmt;
use ndarray::ArrayViewD;

/// Which side of the discrimination a training example belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Examples the filter should respond to with a high peak.
    Authentic,
    /// Examples the filter should suppress.
    Impostor,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::Authentic => write!(f, "authentic"),
            Class::Impostor => write!(f, "impostor"),
        }
    }
}

/// Ordered, append-only set of accepted signals for one [`Class`].
///
/// Every stored signal already has the owning trainer's canonical shape.
#[derive(Debug, Clone)]
pub struct TrainingSet<F> {
    class: Class,
    signals: Vec<Signal<F>>,
}

impl<F> TrainingSet<F> {
    /// Empty set for `class`.
    pub fn new(class: Class) -> Self {
        Self {
            class,
            signals: Vec::new(),
        }
    }

    /// Class of every member.
    pub fn class(&self) -> Class {
        self.class
    }

    /// Number of accepted signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// True until the first signal is accepted.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Accepted signals in insertion order.
    pub fn signals(&self) -> &[Signal<F>] {
        &self.signals
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> core::slice::Iter<'_, Signal<F>> {
        self.signals.iter()
    }

    /// Append an aligned signal and return its index.
    pub(crate) fn insert(&mut self, signal: Signal<F>) -> usize {
        self.signals.push(signal);
        self.signals.len() - 1
    }
}

impl<F> TrainingSet<F>
where
    F: RelativeEq<Epsilon = F> + Copy,
{
    /// Index of the first stored signal content-equal to `candidate`.
    pub fn position(&self, candidate: ArrayViewD<'_, F>, tolerance: F) -> Option<usize> {
        self.signals
            .iter()
            .position(|s| content_eq(s.view(), candidate.view(), tolerance))
    }

    /// True iff some stored signal is content-equal to `candidate`.
    pub fn contains(&self, candidate: ArrayViewD<'_, F>, tolerance: F) -> bool {
        self.position(candidate, tolerance).is_some()
    }
}

impl<'a, F> IntoIterator for &'a TrainingSet<F> {
    type Item = &'a Signal<F>;
    type IntoIter = core::slice::Iter<'a, Signal<F>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ReadSignal;
    use ndarray::array;

    #[test]
    fn insert_then_contains() {
        let mut set = TrainingSet::<f64>::new(Class::Authentic);
        assert!(set.is_empty());

        let a: Signal<f64> = array![[1.0f64, 2.0], [3.0, 4.0]].read_signal().expect("signal");
        let b = array![[1.0f64, 2.0], [3.0, 5.0]].into_dyn();
        assert!(!set.contains(a.view(), 0.0));

        assert_eq!(set.insert(a.clone()), 0);
        assert!(set.contains(a.view(), 0.0));
        assert!(!set.contains(b.view(), 0.0));
        assert_eq!(set.position(a.view(), 0.0), Some(0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.class(), Class::Authentic);
    }

    #[test]
    fn position_reports_first_match() {
        let mut set = TrainingSet::<f32>::new(Class::Impostor);
        set.insert([1.0f32, 0.0, 0.0].read_signal().expect("signal"));
        set.insert([0.0f32, 1.0, 0.0].read_signal().expect("signal"));
        let probe = array![0.0f32, 1.0, 0.0].into_dyn();
        assert_eq!(set.position(probe.view(), f32::EPSILON), Some(1));
        assert_eq!((&set).into_iter().count(), 2);
    }
}
