//! Swarm members and the snapshots the Pareto front keeps of them.
//!
//! A [`Particle`] is live, mutable state owned by the
//! [`Swarm`](crate::Swarm). A [`FrontMember`] is an immutable copy of a
//! particle's position and fitness; the historical front only ever holds
//! `FrontMember`s, so later moves of a particle cannot alter it.

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::objective::Evaluator;
use crate::pareto;
use crate::rng_util::RandomSource;

/// Reserved fitness values with special meaning to the swarm.
///
/// Objectives are assumed normalized to a bounded range. `worst` is the
/// value every objective takes in a not-yet-evaluated or failed result.
/// `singular` is a perfect score that only a degenerate evaluation
/// produces; once a particle's personal best reaches it in any objective,
/// further results for that particle are treated as `worst`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessSentinel {
    /// Worst value of every objective.
    pub worst: f64,
    /// Degenerate perfect value that disqualifies a personal best.
    pub singular: f64,
}

impl FitnessSentinel {
    /// The worst fitness vector for `num_objectives` objectives.
    #[must_use]
    pub fn worst_vector(&self, num_objectives: usize) -> Vec<f64> {
        vec![self.worst; num_objectives]
    }
}

impl Default for FitnessSentinel {
    fn default() -> Self {
        Self {
            worst: 1.0,
            singular: 0.0,
        }
    }
}

/// Coefficients of the velocity update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coefficients {
    /// Weight of the previous velocity.
    pub inertia_weight: f64,
    /// Pull towards the particle's personal best.
    pub cognitive_coefficient: f64,
    /// Pull towards the chosen leader.
    pub social_coefficient: f64,
}

/// An immutable snapshot of a particle on the Pareto front.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontMember {
    position: Vec<f64>,
    fitness: Vec<f64>,
}

impl FrontMember {
    pub(crate) fn new(position: Vec<f64>, fitness: Vec<f64>) -> Self {
        Self { position, fitness }
    }

    /// Position of the particle when the snapshot was taken.
    #[must_use]
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    /// Fitness evaluated at [`position`](Self::position).
    #[must_use]
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Returns `true` if any member of `others` Pareto-dominates this one.
    #[must_use]
    pub fn is_dominated(&self, others: &[FrontMember]) -> bool {
        pareto::is_dominated_by_any(&self.fitness, others.iter().map(FrontMember::fitness))
    }

    /// Bit-level equality of position and fitness.
    pub(crate) fn same_bits(&self, other: &FrontMember) -> bool {
        fn bits_eq(a: &[f64], b: &[f64]) -> bool {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        }
        bits_eq(&self.position, &other.position) && bits_eq(&self.fitness, &other.fitness)
    }
}

/// One candidate solution in the swarm.
///
/// Fitness values are minimized. `velocity` is unbounded; `position` is
/// clipped to the search box after every move.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    position: Vec<f64>,
    velocity: Vec<f64>,
    best_position: Vec<f64>,
    best_fitness: Vec<f64>,
    fitness: Vec<f64>,
}

impl Particle {
    /// Create a particle at a uniformly random position inside `bounds`.
    ///
    /// Velocity starts at zero, the personal best at the start position,
    /// and both fitness vectors at the worst sentinel.
    pub fn new(
        bounds: &Bounds,
        num_objectives: usize,
        sentinel: FitnessSentinel,
        rng: &mut dyn RandomSource,
    ) -> Self {
        let position = bounds.sample(rng);
        Self {
            velocity: vec![0.0; position.len()],
            best_position: position.clone(),
            best_fitness: sentinel.worst_vector(num_objectives),
            fitness: sentinel.worst_vector(num_objectives),
            position,
        }
    }

    /// Rebuild a particle from checkpointed state.
    ///
    /// Fitness is not persisted; it starts at the worst sentinel so the
    /// next iteration re-evaluates the particle.
    pub(crate) fn restore(
        position: Vec<f64>,
        velocity: Vec<f64>,
        best_position: Vec<f64>,
        best_fitness: Vec<f64>,
        sentinel: FitnessSentinel,
    ) -> Self {
        let fitness = sentinel.worst_vector(best_fitness.len());
        Self {
            position,
            velocity,
            best_position,
            best_fitness,
            fitness,
        }
    }

    /// Current position, always inside the bounds.
    #[must_use]
    pub fn position(&self) -> &[f64] {
        &self.position
    }

    /// Current velocity (unbounded).
    #[must_use]
    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    /// Best position this particle has reached.
    #[must_use]
    pub fn best_position(&self) -> &[f64] {
        &self.best_position
    }

    /// Fitness at [`best_position`](Self::best_position).
    #[must_use]
    pub fn best_fitness(&self) -> &[f64] {
        &self.best_fitness
    }

    /// Fitness from the most recent evaluation, or the worst sentinel before one.
    #[must_use]
    pub fn fitness(&self) -> &[f64] {
        &self.fitness
    }

    /// Evaluate the particle with an individual-mode evaluator and store the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModeMismatch`](crate::Error::ModeMismatch) for a
    /// batched evaluator and
    /// [`Error::ObjectiveDimensionMismatch`](crate::Error::ObjectiveDimensionMismatch)
    /// if the objectives produce other than `num_objectives` values. The
    /// particle is unchanged on error.
    pub fn evaluate_fitness(
        &mut self,
        evaluator: &Evaluator,
        num_objectives: usize,
    ) -> crate::Result<()> {
        let fitness = evaluator.evaluate_position(&self.position, num_objectives)?;
        self.set_fitness(fitness, evaluator.fitness_sentinel())
    }

    /// Store `fitness` for the current position and update the personal best.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectiveDimensionMismatch`](crate::Error::ObjectiveDimensionMismatch)
    /// if `fitness` does not have one value per objective. The particle is
    /// unchanged on error.
    pub fn set_fitness(
        &mut self,
        fitness: Vec<f64>,
        sentinel: FitnessSentinel,
    ) -> crate::Result<()> {
        if fitness.len() != self.best_fitness.len() {
            return Err(crate::Error::ObjectiveDimensionMismatch {
                expected: self.best_fitness.len(),
                got: fitness.len(),
            });
        }
        self.fitness = fitness;
        self.update_best(sentinel);
        Ok(())
    }

    /// Personal-best update.
    ///
    /// A best that reached the singular value is poisoned: the current
    /// fitness is replaced by the worst sentinel. Otherwise the best moves
    /// only when the current fitness is strictly lower in every objective.
    #[allow(clippy::float_cmp)]
    fn update_best(&mut self, sentinel: FitnessSentinel) {
        if self.best_fitness.iter().any(|&f| f == sentinel.singular) {
            self.fitness = sentinel.worst_vector(self.fitness.len());
        }
        if pareto::dominates_in_all(&self.fitness, &self.best_fitness) {
            self.best_fitness.clone_from(&self.fitness);
            self.best_position.clone_from(&self.position);
        }
    }

    /// Recompute velocity from inertia, personal best, and a random leader.
    ///
    /// Draws, in order: the leader index, `r1`, then `r2`. An empty leader
    /// pool leaves the social term at zero.
    pub fn update_velocity(
        &mut self,
        leaders: &[FrontMember],
        coefficients: Coefficients,
        rng: &mut dyn RandomSource,
    ) {
        let leader = if leaders.is_empty() {
            None
        } else {
            Some(&leaders[rng.index(leaders.len())])
        };
        let r1 = rng.next_f64();
        let r2 = rng.next_f64();

        for (d, v) in self.velocity.iter_mut().enumerate() {
            let x = self.position[d];
            let cognitive = coefficients.cognitive_coefficient * r1 * (self.best_position[d] - x);
            let social = leader.map_or(0.0, |l| {
                coefficients.social_coefficient * r2 * (l.position[d] - x)
            });
            *v = coefficients.inertia_weight * *v + cognitive + social;
        }
    }

    /// Move by the current velocity and clip to `bounds`.
    pub fn update_position(&mut self, bounds: &Bounds) {
        let moved: Vec<f64> = self
            .position
            .iter()
            .zip(&self.velocity)
            .map(|(x, v)| x + v)
            .collect();
        self.position = bounds.clip(&moved);
    }

    /// Returns `true` if some fitness in `others` Pareto-dominates this particle's fitness.
    #[must_use]
    pub fn is_dominated<'a>(&self, others: impl IntoIterator<Item = &'a [f64]>) -> bool {
        pareto::is_dominated_by_any(&self.fitness, others)
    }

    /// Copy the current position and fitness into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FrontMember {
        FrontMember::new(self.position.clone(), self.fitness.clone())
    }

    #[cfg(test)]
    pub(crate) fn at(position: Vec<f64>, num_objectives: usize, sentinel: FitnessSentinel) -> Self {
        Self {
            velocity: vec![0.0; position.len()],
            best_position: position.clone(),
            best_fitness: sentinel.worst_vector(num_objectives),
            fitness: sentinel.worst_vector(num_objectives),
            position,
        }
    }
}
