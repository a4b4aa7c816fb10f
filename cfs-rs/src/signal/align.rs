use crate::kernel::Rejection;
use core::fmt;
use ndarray::{ArrayViewD, Slice};

/// Policy for reducing an oversized signal to the canonical shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Keep the block that starts at index 0 on every axis.
    #[default]
    Origin,
    /// Keep the block that starts at `(len - canonical) / 2` on every axis.
    Centered,
}

impl Alignment {
    /// Alignment for the `centered` flag of
    /// [`FilterTrainer::set_alignment_mode`](crate::filter::FilterTrainer::set_alignment_mode).
    pub fn from_centered(centered: bool) -> Self {
        if centered {
            Alignment::Centered
        } else {
            Alignment::Origin
        }
    }

    /// Start offset on every axis, or `None` if some axis is too short or
    /// the ranks differ.
    ///
    /// ```
    /// use cfs_rs::signal::Alignment;
    ///
    /// assert_eq!(Alignment::Origin.offsets(&[21], &[15]), Some(vec![0]));
    /// assert_eq!(Alignment::Centered.offsets(&[21], &[15]), Some(vec![3]));
    /// assert_eq!(Alignment::Centered.offsets(&[5, 9], &[4, 4]), Some(vec![0, 2]));
    /// assert_eq!(Alignment::Origin.offsets(&[14], &[15]), None);
    /// ```
    pub fn offsets(self, shape: &[usize], canonical: &[usize]) -> Option<Vec<usize>> {
        if shape.len() != canonical.len() {
            return None;
        }
        shape
            .iter()
            .zip(canonical.iter())
            .map(|(&len, &target)| {
                let extra = len.checked_sub(target)?;
                Some(match self {
                    Alignment::Origin => 0,
                    Alignment::Centered => extra / 2,
                })
            })
            .collect()
    }

    /// Extract the canonical-shaped block of `data`.
    ///
    /// A signal already in canonical shape comes back unchanged. The result
    /// borrows from `data`; nothing is copied.
    pub fn crop<'a, F>(
        self,
        data: ArrayViewD<'a, F>,
        canonical: &[usize],
    ) -> Result<ArrayViewD<'a, F>, Rejection> {
        if data.shape() == canonical {
            return Ok(data);
        }
        let offsets =
            self.offsets(data.shape(), canonical)
                .ok_or_else(|| Rejection::ShapeInfeasible {
                    expected: canonical.to_vec(),
                    got: data.shape().to_vec(),
                })?;
        let mut view = data;
        view.slice_each_axis_inplace(|ax| {
            let i = ax.axis.index();
            Slice::from(offsets[i]..offsets[i] + canonical[i])
        });
        Ok(view)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Origin => write!(f, "origin"),
            Alignment::Centered => write!(f, "centered"),
        }
    }
}
