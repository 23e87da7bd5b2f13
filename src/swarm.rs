//! The swarm optimizer.
//!
//! A [`Swarm`] owns the particles, the historical Pareto front, the
//! iteration counter, and the global-best history. Each call to
//! [`Swarm::step`] runs one iteration with barriers between phases:
//!
//! 1. evaluate every particle (one batched call, or one call per particle);
//! 2. merge the live particles into the historical front and keep only the
//!    non-dominated snapshots;
//! 3. update every particle's velocity, then position, against that one
//!    front;
//! 4. advance the iteration counter and append the global-best fitness to
//!    the history;
//! 5. if configured, write the per-iteration history snapshot and the
//!    checkpoint.
//!
//! A failed evaluation (wrong arity, wrong batch size) aborts the step
//! before any particle is touched.
//!
//! # Examples
//!
//! ```
//! use mopso::{Bounds, Evaluator, Swarm};
//!
//! let bounds = Bounds::new(vec![0.0], vec![1.0]).unwrap();
//! let evaluator = Evaluator::individual(|x: &[f64]| vec![x[0] * x[0], (x[0] - 1.0).powi(2)]);
//!
//! let mut swarm = Swarm::builder(bounds)
//!     .num_objectives(2)
//!     .num_particles(20)
//!     .seed(42)
//!     .build(evaluator)
//!     .unwrap();
//!
//! let front = swarm.optimize(30).unwrap();
//! assert!(!front.is_empty());
//! assert_eq!(swarm.iteration(), 30);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::checkpoint::{self, Checkpoint, CheckpointStore, ParticleState};
use crate::objective::Evaluator;
use crate::pareto;
use crate::particle::{Coefficients, FrontMember, Particle};
use crate::rng_util::RandomSource;
use crate::types::OptimizationMode;

/// Hyperparameters and dimensions of a swarm.
///
/// This is exactly the attributes record of a checkpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwarmConfig {
    pub bounds: Bounds,
    pub num_objectives: usize,
    pub num_particles: usize,
    pub num_params: usize,
    pub inertia_weight: f64,
    pub cognitive_coefficient: f64,
    pub social_coefficient: f64,
    /// Stop `optimize` early after this many iterations without a new front member.
    pub max_iterations_without_improvement: Option<usize>,
    pub optimization_mode: OptimizationMode,
}

impl SwarmConfig {
    /// Check bounds, dimension counts, and coefficients for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> crate::Result<()> {
        self.bounds.validate()?;
        if self.num_params != self.bounds.len() {
            return Err(crate::Error::DimensionMismatch {
                what: "num_params",
                expected: self.bounds.len(),
                got: self.num_params,
            });
        }
        if self.num_particles == 0 {
            return Err(crate::Error::InvalidSwarmSize);
        }
        if self.num_objectives == 0 {
            return Err(crate::Error::NoObjectives);
        }
        for (name, value) in [
            ("inertia_weight", self.inertia_weight),
            ("cognitive_coefficient", self.cognitive_coefficient),
            ("social_coefficient", self.social_coefficient),
        ] {
            if !value.is_finite() {
                return Err(crate::Error::InvalidHyperparameter { name, value });
            }
        }
        if self.max_iterations_without_improvement == Some(0) {
            return Err(crate::Error::InvalidHyperparameter {
                name: "max_iterations_without_improvement",
                value: 0.0,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn coefficients(&self) -> Coefficients {
        Coefficients {
            inertia_weight: self.inertia_weight,
            cognitive_coefficient: self.cognitive_coefficient,
            social_coefficient: self.social_coefficient,
        }
    }
}

/// A builder for [`Swarm`], created by [`Swarm::builder`].
///
/// # Defaults
///
/// | Setting | Default |
/// |---|---|
/// | `num_particles` | 50 |
/// | `num_objectives` | number of registered objective functions |
/// | `inertia_weight` | 0.5 |
/// | `cognitive_coefficient` | 1.0 |
/// | `social_coefficient` | 1.0 |
/// | `max_iterations_without_improvement` | none |
/// | random source | `fastrand` with a random seed |
/// | checkpoint / history directories | none |
pub struct SwarmBuilder {
    bounds: Bounds,
    num_objectives: Option<usize>,
    num_particles: usize,
    inertia_weight: f64,
    cognitive_coefficient: f64,
    social_coefficient: f64,
    max_iterations_without_improvement: Option<usize>,
    rng: Option<Box<dyn RandomSource>>,
    checkpoint_dir: Option<PathBuf>,
    history_dir: Option<PathBuf>,
}

impl SwarmBuilder {
    fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            num_objectives: None,
            num_particles: 50,
            inertia_weight: 0.5,
            cognitive_coefficient: 1.0,
            social_coefficient: 1.0,
            max_iterations_without_improvement: None,
            rng: None,
            checkpoint_dir: None,
            history_dir: None,
        }
    }

    /// Sets the number of objectives, when an objective function returns several values.
    #[must_use]
    pub fn num_objectives(mut self, n: usize) -> Self {
        self.num_objectives = Some(n);
        self
    }

    #[must_use]
    pub fn num_particles(mut self, n: usize) -> Self {
        self.num_particles = n;
        self
    }

    #[must_use]
    pub fn inertia_weight(mut self, w: f64) -> Self {
        self.inertia_weight = w;
        self
    }

    #[must_use]
    pub fn cognitive_coefficient(mut self, c1: f64) -> Self {
        self.cognitive_coefficient = c1;
        self
    }

    #[must_use]
    pub fn social_coefficient(mut self, c2: f64) -> Self {
        self.social_coefficient = c2;
        self
    }

    /// Stop [`Swarm::optimize`] after `n` consecutive iterations in which no
    /// particle joined the Pareto front. `n` must be at least 1.
    #[must_use]
    pub fn max_iterations_without_improvement(mut self, n: usize) -> Self {
        self.max_iterations_without_improvement = Some(n);
        self
    }

    /// Use a `fastrand` generator seeded with `seed`.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(Box::new(fastrand::Rng::with_seed(seed)));
        self
    }

    /// Use a custom random source.
    #[must_use]
    pub fn rng(mut self, rng: impl RandomSource + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Write a checkpoint to `dir` after every iteration.
    #[must_use]
    pub fn checkpoint_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.checkpoint_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Write every particle's position and fitness to `dir/iteration<k>.csv`
    /// after every iteration.
    #[must_use]
    pub fn history_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.history_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Build a fresh swarm with particles drawn uniformly inside the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoObjectives`](crate::Error::NoObjectives) for an
    /// empty evaluator, [`Error::InvalidSwarmSize`](crate::Error::InvalidSwarmSize)
    /// for zero particles, and
    /// [`Error::InvalidHyperparameter`](crate::Error::InvalidHyperparameter)
    /// for non-finite coefficients.
    pub fn build(self, evaluator: Evaluator) -> crate::Result<Swarm> {
        if evaluator.is_empty() {
            return Err(crate::Error::NoObjectives);
        }
        let config = SwarmConfig {
            num_objectives: self.num_objectives.unwrap_or(evaluator.len()),
            num_particles: self.num_particles,
            num_params: self.bounds.len(),
            inertia_weight: self.inertia_weight,
            cognitive_coefficient: self.cognitive_coefficient,
            social_coefficient: self.social_coefficient,
            max_iterations_without_improvement: self.max_iterations_without_improvement,
            optimization_mode: evaluator.mode(),
            bounds: self.bounds,
        };
        config.validate()?;

        let mut rng = self
            .rng
            .unwrap_or_else(|| Box::new(fastrand::Rng::new()));
        let sentinel = evaluator.fitness_sentinel();
        let particles = (0..config.num_particles)
            .map(|_| Particle::new(&config.bounds, config.num_objectives, sentinel, rng.as_mut()))
            .collect();

        trace_info!(
            particles = config.num_particles,
            params = config.num_params,
            objectives = config.num_objectives,
            mode = %config.optimization_mode,
            "swarm initialized"
        );

        Ok(Swarm {
            global_best_position: vec![0.0; config.num_params],
            global_best_fitness: vec![f64::INFINITY; config.num_objectives],
            config,
            evaluator,
            rng,
            particles,
            pareto_front: Vec::new(),
            iteration: 0,
            history: Vec::new(),
            stalled_iterations: 0,
            store: self.checkpoint_dir.map(CheckpointStore::new),
            history_dir: self.history_dir,
        })
    }

    /// Resume a swarm from the checkpoint in `dir`.
    ///
    /// The builder's bounds, and its `num_objectives` if set, must match the
    /// checkpoint; all other hyperparameters come from the checkpoint.
    /// Unless [`checkpoint_dir`](Self::checkpoint_dir) names another
    /// directory, later checkpoints are written back to `dir`. How many
    /// more iterations to run is up to the caller of [`Swarm::optimize`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CheckpointMismatch`](crate::Error::CheckpointMismatch)
    /// or [`Error::ModeMismatch`](crate::Error::ModeMismatch) if the
    /// checkpoint disagrees with the request (checked before any particle
    /// is rebuilt), and [`Error::Checkpoint`](crate::Error::Checkpoint) if
    /// it is missing or malformed.
    pub fn resume(self, dir: impl AsRef<Path>, evaluator: Evaluator) -> crate::Result<Swarm> {
        let store = CheckpointStore::new(dir);
        let stored = store.load_attributes()?;
        self.check_compatible(&stored, &evaluator)?;

        let checkpoint = store.load()?;
        let store = self.checkpoint_dir.map_or(store, CheckpointStore::new);
        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(fastrand::Rng::new()));

        trace_info!(iteration = checkpoint.iteration, "swarm resumed");
        Ok(Swarm::from_checkpoint(
            checkpoint,
            evaluator,
            rng,
            Some(store),
            self.history_dir,
        ))
    }

    fn check_compatible(&self, stored: &SwarmConfig, evaluator: &Evaluator) -> crate::Result<()> {
        if stored.bounds != self.bounds {
            return Err(crate::Error::CheckpointMismatch {
                field: "bounds",
                expected: format!("{:?} .. {:?}", self.bounds.lower(), self.bounds.upper()),
                found: format!("{:?} .. {:?}", stored.bounds.lower(), stored.bounds.upper()),
            });
        }
        if let Some(n) = self.num_objectives.filter(|&n| n != stored.num_objectives) {
            return Err(crate::Error::CheckpointMismatch {
                field: "num_objectives",
                expected: n.to_string(),
                found: stored.num_objectives.to_string(),
            });
        }
        if evaluator.mode() != stored.optimization_mode {
            return Err(crate::Error::ModeMismatch {
                expected: stored.optimization_mode,
                got: evaluator.mode(),
            });
        }
        if evaluator.is_empty() {
            return Err(crate::Error::NoObjectives);
        }
        Ok(())
    }
}

/// A multi-objective particle swarm.
pub struct Swarm {
    config: SwarmConfig,
    evaluator: Evaluator,
    rng: Box<dyn RandomSource>,
    particles: Vec<Particle>,
    pareto_front: Vec<FrontMember>,
    global_best_position: Vec<f64>,
    global_best_fitness: Vec<f64>,
    iteration: u64,
    history: Vec<Vec<f64>>,
    stalled_iterations: usize,
    store: Option<CheckpointStore>,
    history_dir: Option<PathBuf>,
}

impl Swarm {
    /// Start configuring a swarm over `bounds`.
    #[must_use]
    pub fn builder(bounds: Bounds) -> SwarmBuilder {
        SwarmBuilder::new(bounds)
    }

    fn from_checkpoint(
        checkpoint: Checkpoint,
        evaluator: Evaluator,
        rng: Box<dyn RandomSource>,
        store: Option<CheckpointStore>,
        history_dir: Option<PathBuf>,
    ) -> Self {
        let sentinel = evaluator.fitness_sentinel();
        let particles = checkpoint
            .particles
            .into_iter()
            .map(|p| {
                Particle::restore(p.position, p.velocity, p.best_position, p.best_fitness, sentinel)
            })
            .collect();
        Self {
            config: checkpoint.config,
            evaluator,
            rng,
            particles,
            pareto_front: checkpoint.pareto_front,
            global_best_position: checkpoint.global_best_position,
            global_best_fitness: checkpoint.global_best_fitness,
            iteration: checkpoint.iteration,
            history: checkpoint.history,
            stalled_iterations: 0,
            store,
            history_dir,
        }
    }

    /// Hyperparameters and dimensions, as stored in a checkpoint.
    #[must_use]
    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// The live particles, in a fixed order.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The historical Pareto front: non-dominated snapshots over every iteration so far.
    #[must_use]
    pub fn pareto_front(&self) -> &[FrontMember] {
        &self.pareto_front
    }

    /// Number of completed iterations, including those before a resume.
    #[must_use]
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Global-best fitness after each completed iteration.
    #[must_use]
    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    /// Position of the global best; the zero vector before the first iteration.
    #[must_use]
    pub fn global_best_position(&self) -> &[f64] {
        &self.global_best_position
    }

    /// Fitness of the global best; `+inf` per objective before the first iteration.
    #[must_use]
    pub fn global_best_fitness(&self) -> &[f64] {
        &self.global_best_fitness
    }

    /// Consecutive iterations in which no particle joined the Pareto front.
    #[must_use]
    pub fn stalled_iterations(&self) -> usize {
        self.stalled_iterations
    }

    /// Run up to `n_iterations` iterations and return the historical front.
    ///
    /// When a checkpoint directory is configured and holds no checkpoint
    /// yet, the attributes record is written before the first iteration so
    /// storage problems surface early. An existing checkpoint is only
    /// replaced once an iteration has been evaluated successfully. Stops
    /// early if `max_iterations_without_improvement` is reached.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`step`](Self::step) or from
    /// writing the attributes record.
    pub fn optimize(&mut self, n_iterations: usize) -> crate::Result<&[FrontMember]> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize",
            n_iterations,
            start = self.iteration,
            mode = %self.config.optimization_mode
        )
        .entered();

        if let Some(store) = self.store.as_ref().filter(|store| !store.exists()) {
            store.save_attributes(&self.config)?;
        }

        for _ in 0..n_iterations {
            self.step()?;
            if self
                .config
                .max_iterations_without_improvement
                .is_some_and(|limit| self.stalled_iterations >= limit)
            {
                trace_info!(
                    iteration = self.iteration,
                    stalled = self.stalled_iterations,
                    "stopping early: front stopped improving"
                );
                break;
            }
        }

        Ok(self.pareto_front.as_slice())
    }

    /// Run one iteration.
    ///
    /// # Errors
    ///
    /// Evaluation errors ([`Error::ObjectiveDimensionMismatch`](crate::Error::ObjectiveDimensionMismatch),
    /// [`Error::BatchSizeMismatch`](crate::Error::BatchSizeMismatch)) leave
    /// the swarm unchanged. Errors writing the history snapshot or
    /// checkpoint are returned after the iteration has been applied in
    /// memory.
    pub fn step(&mut self) -> crate::Result<()> {
        let positions: Vec<Vec<f64>> = self
            .particles
            .iter()
            .map(|p| p.position().to_vec())
            .collect();
        let fitness =
            self.evaluator
                .evaluate_swarm(&positions, self.iteration, self.config.num_objectives)?;

        let sentinel = self.evaluator.fitness_sentinel();
        for (particle, f) in self.particles.iter_mut().zip(fitness) {
            particle.set_fitness(f, sentinel)?;
        }
        self.update_global_best();

        let evaluated: Option<Vec<FrontMember>> = self
            .history_dir
            .as_ref()
            .map(|_| self.particles.iter().map(Particle::snapshot).collect());

        if self.update_pareto_front() {
            self.stalled_iterations = 0;
        } else {
            self.stalled_iterations += 1;
        }

        let coefficients = self.config.coefficients();
        for particle in &mut self.particles {
            particle.update_velocity(&self.pareto_front, coefficients, self.rng.as_mut());
            particle.update_position(&self.config.bounds);
        }

        let evaluated_iteration = self.iteration;
        self.iteration += 1;
        self.history.push(self.global_best_fitness.clone());

        trace_info!(
            iteration = self.iteration,
            front_size = self.pareto_front.len(),
            stalled = self.stalled_iterations,
            "iteration completed"
        );

        if let (Some(dir), Some(members)) = (&self.history_dir, evaluated) {
            checkpoint::write_history_snapshot(dir, evaluated_iteration, &members)?;
        }
        if let Some(store) = &self.store {
            store.save(&self.checkpoint())?;
        }
        Ok(())
    }

    /// Non-dominated particles of the current swarm only, most isolated first.
    ///
    /// Ordering is by crowding distance, descending; boundary members come first.
    #[must_use]
    pub fn current_front(&self) -> Vec<FrontMember> {
        let fitness: Vec<Vec<f64>> = self.particles.iter().map(|p| p.fitness().to_vec()).collect();
        let members: Vec<FrontMember> = pareto::non_dominated_indices(&fitness)
            .into_iter()
            .map(|i| self.particles[i].snapshot())
            .collect();
        let front_fitness: Vec<Vec<f64>> = members.iter().map(|m| m.fitness().to_vec()).collect();
        let distances = pareto::crowding_distance(&front_fitness);

        let mut ranked: Vec<(f64, FrontMember)> = distances.into_iter().zip(members).collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().map(|(_, m)| m).collect()
    }

    /// Snapshot the full optimizer state for persistence.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            config: self.config.clone(),
            particles: self
                .particles
                .iter()
                .map(|p| ParticleState {
                    position: p.position().to_vec(),
                    velocity: p.velocity().to_vec(),
                    best_position: p.best_position().to_vec(),
                    best_fitness: p.best_fitness().to_vec(),
                })
                .collect(),
            global_best_position: self.global_best_position.clone(),
            global_best_fitness: self.global_best_fitness.clone(),
            iteration: self.iteration,
            pareto_front: self.pareto_front.clone(),
            history: self.history.clone(),
        }
    }

    /// Replace the global best with any particle that is no worse in every objective.
    fn update_global_best(&mut self) {
        for particle in &self.particles {
            if particle
                .fitness()
                .iter()
                .zip(&self.global_best_fitness)
                .all(|(f, best)| f <= best)
            {
                self.global_best_fitness = particle.fitness().to_vec();
                self.global_best_position = particle.position().to_vec();
            }
        }
    }

    /// Merge the live swarm into the historical front.
    ///
    /// Returns `true` if a live particle entered the front with a position
    /// and fitness not already on it.
    fn update_pareto_front(&mut self) -> bool {
        let previous = core::mem::take(&mut self.pareto_front);
        let live: Vec<FrontMember> = self.particles.iter().map(Particle::snapshot).collect();
        let union: Vec<&FrontMember> = live.iter().chain(&previous).collect();

        let mut next: Vec<FrontMember> = Vec::new();
        let mut improved = false;
        for (i, &member) in union.iter().enumerate() {
            let dominated =
                pareto::is_dominated_by_any(member.fitness(), union.iter().map(|m| m.fitness()));
            if dominated || next.iter().any(|kept| kept.same_bits(member)) {
                continue;
            }
            if i < live.len() && !previous.iter().any(|old| old.same_bits(member)) {
                improved = true;
            }
            next.push(member.clone());
        }

        self.pareto_front = next;
        improved
    }
}

impl core::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Swarm")
            .field("config", &self.config)
            .field("evaluator", &self.evaluator)
            .field("iteration", &self.iteration)
            .field("front_size", &self.pareto_front.len())
            .finish_non_exhaustive()
    }
}
