//! Pareto dominance and diversity utilities.
//!
//! All objectives are minimized. A fitness vector `a` **dominates** `b` when
//! it is no worse in every objective and strictly better in at least one.
//! The historical front kept by the [`Swarm`](crate::Swarm) is the set of
//! snapshots that no other snapshot or live particle dominates.
//!
//! | Function | Purpose |
//! |---|---|
//! | [`dominates`] | Standard Pareto dominance (front maintenance) |
//! | [`dominates_in_all`] | Strict improvement in every objective (personal-best rule) |
//! | [`non_dominated_indices`] | Filter a set of fitness vectors to its Pareto front |
//! | [`crowding_distance`] | Measure how isolated each front member is |
//!
//! # Example
//!
//! ```
//! use mopso::pareto::{crowding_distance, dominates, non_dominated_indices};
//!
//! assert!(dominates(&[0.05, 0.15], &[0.1, 0.2]));
//! assert!(!dominates(&[0.2, 0.1], &[0.1, 0.2]));
//!
//! let fitness = vec![
//!     vec![1.0, 5.0],
//!     vec![5.0, 1.0],
//!     vec![3.0, 3.0],
//!     vec![4.0, 4.0], // dominated by (3, 3)
//! ];
//! assert_eq!(non_dominated_indices(&fitness), vec![0, 1, 2]);
//!
//! let front: Vec<_> = fitness[..3].to_vec();
//! let cd = crowding_distance(&front);
//! assert!(cd[0].is_infinite() && cd[1].is_infinite());
//! assert!(cd[2].is_finite());
//! ```

/// Returns `true` if fitness `a` Pareto-dominates fitness `b`.
///
/// `a` must be `<=` `b` in every objective and `<` in at least one.
/// Equal vectors do not dominate each other.
#[must_use]
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    let mut strictly_better = false;
    for (&av, &bv) in a.iter().zip(b) {
        if av > bv {
            return false;
        }
        if av < bv {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Returns `true` if `a` is strictly lower than `b` in **every** objective.
///
/// This conjunctive rule governs personal-best replacement and is stricter
/// than [`dominates`]: `[0.1, 0.2]` dominates `[0.1, 0.3]` but does not
/// improve on it in all objectives.
#[must_use]
pub fn dominates_in_all(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).all(|(&av, &bv)| av < bv)
}

/// Returns `true` if any vector in `others` dominates `fitness`.
pub(crate) fn is_dominated_by_any<'a>(
    fitness: &[f64],
    others: impl IntoIterator<Item = &'a [f64]>,
) -> bool {
    others.into_iter().any(|other| dominates(other, fitness))
}

/// Indices of the non-dominated members of `fitness`, in input order.
///
/// Duplicated vectors do not dominate one another, so every copy of a
/// non-dominated vector is kept.
///
/// Complexity: O(M * N²) for N vectors of M objectives.
#[must_use]
pub fn non_dominated_indices(fitness: &[Vec<f64>]) -> Vec<usize> {
    (0..fitness.len())
        .filter(|&i| !is_dominated_by_any(&fitness[i], fitness.iter().map(Vec::as_slice)))
        .collect()
}

/// Crowding distance of each member of `front` (same order).
///
/// For every objective the front is sorted by that objective; the first
/// and last members receive [`f64::INFINITY`], and each interior member
/// accumulates the gap between its two neighbours divided by the
/// objective's range. Objectives with zero range contribute nothing.
/// Fronts of one or two members are all boundary.
#[must_use]
#[allow(clippy::needless_range_loop)]
pub fn crowding_distance(front: &[Vec<f64>]) -> Vec<f64> {
    let n = front.len();
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }

    let m = front[0].len();
    let mut distances = vec![0.0_f64; n];

    for obj in 0..m {
        let mut sorted: Vec<usize> = (0..n).collect();
        sorted.sort_by(|&a, &b| front[a][obj].total_cmp(&front[b][obj]));

        distances[sorted[0]] = f64::INFINITY;
        distances[sorted[n - 1]] = f64::INFINITY;

        let range = front[sorted[n - 1]][obj] - front[sorted[0]][obj];
        if range > 0.0 {
            for i in 1..(n - 1) {
                distances[sorted[i]] +=
                    (front[sorted[i + 1]][obj] - front[sorted[i - 1]][obj]) / range;
            }
        }
    }

    distances
}
