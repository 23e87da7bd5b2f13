//! The objective evaluator: the only boundary between the swarm and the
//! problem being optimized.
//!
//! An [`Evaluator`] is built once, in one of two modes:
//!
//! - **Individual**: every [`IndividualObjective`] is called once per
//!   particle with that particle's position.
//! - **Batched** (global): every [`BatchObjective`] is called once per
//!   iteration with all positions and the iteration index, and returns one
//!   row per particle. Use this mode when evaluations are expensive and the
//!   objective wants to run them in parallel or as one external job.
//!
//! Each objective function may contribute several objective values; the
//! outputs of all registered functions are concatenated, in registration
//! order, into a particle's fitness vector.
//!
//! Closures work directly thanks to blanket impls:
//!
//! ```
//! use mopso::Evaluator;
//!
//! // Two objectives from one function.
//! let individual = Evaluator::individual(|x: &[f64]| vec![x[0], 1.0 - x[0]]);
//!
//! // One row per particle, computed in one call.
//! let batched = Evaluator::batched(|xs: &[Vec<f64>], _iteration: u64| {
//!     xs.iter().map(|x| vec![x[0], 1.0 - x[0]]).collect::<Vec<_>>()
//! });
//! # let _ = (individual, batched);
//! ```
//!
//! A failed or degenerate evaluation should return the worst sentinel
//! (see [`FitnessSentinel`]); the swarm treats it as an ordinary bad
//! result.

use crate::particle::FitnessSentinel;
use crate::types::OptimizationMode;

/// An objective evaluated one position at a time.
pub trait IndividualObjective {
    /// Return the objective values for `position` (lower is better).
    fn evaluate(&self, position: &[f64]) -> Vec<f64>;
}

impl<F> IndividualObjective for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn evaluate(&self, position: &[f64]) -> Vec<f64> {
        self(position)
    }
}

/// An objective evaluated for the whole swarm in one call.
pub trait BatchObjective {
    /// Return one row of objective values per entry of `positions`, in the same order.
    fn evaluate_batch(&self, positions: &[Vec<f64>], iteration: u64) -> Vec<Vec<f64>>;
}

impl<F> BatchObjective for F
where
    F: Fn(&[Vec<f64>], u64) -> Vec<Vec<f64>>,
{
    fn evaluate_batch(&self, positions: &[Vec<f64>], iteration: u64) -> Vec<Vec<f64>> {
        self(positions, iteration)
    }
}

enum Objectives {
    Individual(Vec<Box<dyn IndividualObjective>>),
    Batched(Vec<Box<dyn BatchObjective>>),
}

/// The registered objective functions plus the fitness sentinel they use.
pub struct Evaluator {
    objectives: Objectives,
    sentinel: FitnessSentinel,
}

impl Evaluator {
    /// Create an individual-mode evaluator from a single objective.
    #[must_use]
    pub fn individual(objective: impl IndividualObjective + 'static) -> Self {
        Self::from_individual(vec![Box::new(objective)])
    }

    /// Create an individual-mode evaluator from several objectives.
    #[must_use]
    pub fn from_individual(objectives: Vec<Box<dyn IndividualObjective>>) -> Self {
        Self {
            objectives: Objectives::Individual(objectives),
            sentinel: FitnessSentinel::default(),
        }
    }

    /// Create a batched (global-mode) evaluator from a single objective.
    #[must_use]
    pub fn batched(objective: impl BatchObjective + 'static) -> Self {
        Self::from_batched(vec![Box::new(objective)])
    }

    /// Create a batched (global-mode) evaluator from several objectives.
    #[must_use]
    pub fn from_batched(objectives: Vec<Box<dyn BatchObjective>>) -> Self {
        Self {
            objectives: Objectives::Batched(objectives),
            sentinel: FitnessSentinel::default(),
        }
    }

    /// Set the sentinel values the objectives use. Default: worst `1.0`, singular `0.0`.
    #[must_use]
    pub fn sentinel(mut self, sentinel: FitnessSentinel) -> Self {
        self.sentinel = sentinel;
        self
    }

    #[must_use]
    pub fn fitness_sentinel(&self) -> FitnessSentinel {
        self.sentinel
    }

    #[must_use]
    pub fn mode(&self) -> OptimizationMode {
        match self.objectives {
            Objectives::Individual(_) => OptimizationMode::Individual,
            Objectives::Batched(_) => OptimizationMode::Global,
        }
    }

    /// Number of registered objective functions.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.objectives {
            Objectives::Individual(o) => o.len(),
            Objectives::Batched(o) => o.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate one position with every individual objective.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeMismatch`](crate::Error::ModeMismatch) for a
    /// batched evaluator, and
    /// [`Error::ObjectiveDimensionMismatch`](crate::Error::ObjectiveDimensionMismatch)
    /// if the concatenated output does not have `num_objectives` values.
    pub fn evaluate_position(
        &self,
        position: &[f64],
        num_objectives: usize,
    ) -> crate::Result<Vec<f64>> {
        let Objectives::Individual(objectives) = &self.objectives else {
            return Err(crate::Error::ModeMismatch {
                expected: OptimizationMode::Individual,
                got: OptimizationMode::Global,
            });
        };

        let mut fitness = Vec::with_capacity(num_objectives);
        for objective in objectives {
            fitness.extend(objective.evaluate(position));
        }
        check_arity(&fitness, num_objectives)?;
        Ok(fitness)
    }

    /// Evaluate every position of the swarm, returning one fitness vector per position.
    ///
    /// Nothing is applied to particles here, so a failure leaves the swarm
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BatchSizeMismatch`](crate::Error::BatchSizeMismatch)
    /// if a batched objective returns the wrong number of rows, and
    /// [`Error::ObjectiveDimensionMismatch`](crate::Error::ObjectiveDimensionMismatch)
    /// if any particle ends up with other than `num_objectives` values.
    pub(crate) fn evaluate_swarm(
        &self,
        positions: &[Vec<f64>],
        iteration: u64,
        num_objectives: usize,
    ) -> crate::Result<Vec<Vec<f64>>> {
        match &self.objectives {
            Objectives::Individual(_) => {
                trace_debug!(particles = positions.len(), "evaluating particles individually");
                positions
                    .iter()
                    .map(|p| self.evaluate_position(p, num_objectives))
                    .collect()
            }
            Objectives::Batched(objectives) => {
                trace_debug!(particles = positions.len(), iteration, "evaluating batch");
                let mut fitness = vec![Vec::with_capacity(num_objectives); positions.len()];
                for objective in objectives {
                    let rows = objective.evaluate_batch(positions, iteration);
                    if rows.len() != positions.len() {
                        return Err(crate::Error::BatchSizeMismatch {
                            expected: positions.len(),
                            got: rows.len(),
                        });
                    }
                    for (acc, row) in fitness.iter_mut().zip(rows) {
                        acc.extend(row);
                    }
                }
                for f in &fitness {
                    check_arity(f, num_objectives)?;
                }
                Ok(fitness)
            }
        }
    }
}

impl core::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Evaluator")
            .field("mode", &self.mode())
            .field("objectives", &self.len())
            .field("sentinel", &self.sentinel)
            .finish()
    }
}

fn check_arity(fitness: &[f64], num_objectives: usize) -> crate::Result<()> {
    if fitness.len() == num_objectives {
        Ok(())
    } else {
        Err(crate::Error::ObjectiveDimensionMismatch {
            expected: num_objectives,
            got: fitness.len(),
        })
    }
}
