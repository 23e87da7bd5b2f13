//! Box bounds for the search space.
//!
//! Every particle position is a plain `Vec<f64>` whose length equals
//! [`Bounds::len`]; the swarm keeps it inside the box by passing every
//! candidate through [`Bounds::clip`] after a move.

use serde::{Deserialize, Serialize};

use crate::rng_util::{self, RandomSource};

/// Per-dimension lower and upper bounds, immutable after construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Create bounds from matching lower and upper vectors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BoundsLengthMismatch`](crate::Error::BoundsLengthMismatch)
    /// if the vectors differ in length, [`Error::EmptyBounds`](crate::Error::EmptyBounds)
    /// if they are empty, and [`Error::InvalidBounds`](crate::Error::InvalidBounds)
    /// if any dimension has `low > high` or a non-finite limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use mopso::Bounds;
    ///
    /// let bounds = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
    /// assert_eq!(bounds.len(), 2);
    /// assert_eq!(bounds.clip(&[2.0, -3.0]), vec![1.0, -1.0]);
    /// ```
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> crate::Result<Self> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Check the invariants that [`Bounds::new`] enforces.
    ///
    /// Deserialized bounds bypass the constructor, so loaders call this.
    pub(crate) fn validate(&self) -> crate::Result<()> {
        if self.lower.len() != self.upper.len() {
            return Err(crate::Error::BoundsLengthMismatch {
                lower: self.lower.len(),
                upper: self.upper.len(),
            });
        }
        if self.lower.is_empty() {
            return Err(crate::Error::EmptyBounds);
        }
        for (index, (&low, &high)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(crate::Error::InvalidBounds { index, low, high });
            }
        }
        Ok(())
    }

    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Always `false`: empty bounds are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower limit of each dimension.
    #[must_use]
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper limit of each dimension.
    #[must_use]
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Truncate each component of `point` to its `[low, high]` interval.
    ///
    /// This is a hard clamp: components beyond a limit land exactly on it.
    #[must_use]
    pub fn clip(&self, point: &[f64]) -> Vec<f64> {
        debug_assert_eq!(point.len(), self.len());
        point
            .iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(&v, (&low, &high))| v.max(low).min(high))
            .collect()
    }

    /// Returns `true` if every component of `point` lies within its interval.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.len()
            && point
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(&v, (&low, &high))| v >= low && v <= high)
    }

    /// Draw a point uniformly at random inside the box.
    pub(crate) fn sample(&self, rng: &mut dyn RandomSource) -> Vec<f64> {
        self.lower
            .iter()
            .zip(&self.upper)
            .map(|(&low, &high)| rng_util::f64_range(rng, low, high).max(low).min(high))
            .collect()
    }
}
