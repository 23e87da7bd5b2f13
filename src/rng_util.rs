//! Injectable randomness.
//!
//! Every random draw the swarm makes (initial positions, leader choice, the
//! two velocity coefficients) goes through a [`RandomSource`] owned by the
//! [`Swarm`](crate::Swarm), so a seeded run is fully reproducible.

/// A source of uniform random numbers.
///
/// Implemented for [`fastrand::Rng`], which is what
/// [`SwarmBuilder::seed`](crate::SwarmBuilder::seed) installs. Implement it
/// yourself to script the exact draws a test expects.
pub trait RandomSource {
    /// Return a uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Return a uniform index in `0..len`.
    ///
    /// `len` must be non-zero.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }
}

impl RandomSource for fastrand::Rng {
    fn next_f64(&mut self) -> f64 {
        self.f64()
    }

    fn index(&mut self, len: usize) -> usize {
        self.usize(..len)
    }
}

/// Generate a random `f64` in the range `[low, high]`.
///
/// Interpolates between the limits rather than scaling `high - low`, which
/// overflows for limits near `f64::MAX` in magnitude.
#[inline]
pub(crate) fn f64_range(rng: &mut dyn RandomSource, low: f64, high: f64) -> f64 {
    let u = rng.next_f64();
    low * (1.0 - u) + high * u
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(f64);

    impl RandomSource for Fixed {
        fn next_f64(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_default_index_stays_in_range() {
        assert_eq!(Fixed(0.0).index(4), 0);
        assert_eq!(Fixed(0.5).index(4), 2);
        assert_eq!(Fixed(0.999_999_999).index(4), 3);
    }

    #[test]
    fn test_f64_range() {
        let mut rng = Fixed(0.25);
        assert!((f64_range(&mut rng, 2.0, 6.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_f64_range_extreme_limits_stay_finite() {
        for u in [0.0, 0.5, 0.999_999] {
            let v = f64_range(&mut Fixed(u), -1e308, 1e308);
            assert!(v.is_finite() && (-1e308..=1e308).contains(&v), "{u} -> {v}");
        }
    }

    #[test]
    fn test_fastrand_seeded_is_reproducible() {
        let mut a = fastrand::Rng::with_seed(7);
        let mut b = fastrand::Rng::with_seed(7);
        for _ in 0..10 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
            assert_eq!(a.index(5), b.index(5));
        }
    }
}
