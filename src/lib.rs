#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Multi-objective particle swarm optimization (MOPSO) over a bounded,
//! continuous search box, with durable checkpoints so long runs can stop
//! and resume where they left off.
//!
//! Every objective is minimized. The swarm keeps a historical Pareto front
//! of non-dominated snapshots; each iteration every particle is pulled
//! towards its own best position and towards a leader drawn uniformly from
//! that front.
//!
//! # Getting Started
//!
//! ```
//! use mopso::prelude::*;
//!
//! // Schaffer N.1: minimize x² and (x - 2)².
//! let bounds = Bounds::new(vec![-5.0], vec![5.0]).unwrap();
//! let evaluator = Evaluator::individual(|x: &[f64]| vec![x[0] * x[0], (x[0] - 2.0).powi(2)]);
//!
//! let mut swarm = Swarm::builder(bounds)
//!     .num_objectives(2)
//!     .num_particles(30)
//!     .seed(7)
//!     .build(evaluator)
//!     .unwrap();
//!
//! for member in swarm.optimize(50).unwrap() {
//!     println!("x = {:?}, f = {:?}", member.position(), member.fitness());
//! }
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Swarm`] | Drive the optimization loop and own all state. |
//! | [`SwarmBuilder`] | Configure hyperparameters, randomness, and persistence; build or resume a swarm. |
//! | [`Evaluator`] | Wrap the objective functions, called per particle or once per iteration. |
//! | [`Bounds`] | Per-dimension lower and upper limits of the search box. |
//! | [`FrontMember`] | An immutable (position, fitness) snapshot on the Pareto front. |
//! | [`CheckpointStore`] | Save and load the full swarm state in a directory. |
//!
//! # Optimization modes
//!
//! | Mode | Objective signature | Calls per iteration |
//! |------|---------------------|---------------------|
//! | [`OptimizationMode::Individual`] | `Fn(&[f64]) -> Vec<f64>` | one per particle |
//! | [`OptimizationMode::Global`] | `Fn(&[Vec<f64>], u64) -> Vec<Vec<f64>>` | one for the whole swarm |
//!
//! # Persistence
//!
//! With [`SwarmBuilder::checkpoint_dir`] set, the swarm writes a checkpoint
//! after every iteration; [`SwarmBuilder::resume`] rebuilds it. A run of
//! `k` iterations, resumed for `n` more, ends at iteration `k + n` with a
//! history of `k + n` rows.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for each iteration and checkpoint | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod bounds;
mod checkpoint;
mod error;
mod objective;
pub mod pareto;
mod particle;
mod rng_util;
mod swarm;
mod types;

pub use bounds::Bounds;
pub use checkpoint::{
    Checkpoint, CheckpointStore, ParticleState, read_history_snapshot, write_history_snapshot,
};
pub use error::{Error, Result};
pub use objective::{BatchObjective, Evaluator, IndividualObjective};
pub use particle::{Coefficients, FitnessSentinel, FrontMember, Particle};
pub use rng_util::RandomSource;
pub use swarm::{Swarm, SwarmBuilder, SwarmConfig};
pub use types::OptimizationMode;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use mopso::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::Bounds;
    pub use crate::checkpoint::{Checkpoint, CheckpointStore};
    pub use crate::error::{Error, Result};
    pub use crate::objective::{BatchObjective, Evaluator, IndividualObjective};
    pub use crate::particle::{FitnessSentinel, FrontMember};
    pub use crate::swarm::{Swarm, SwarmBuilder, SwarmConfig};
    pub use crate::types::OptimizationMode;
}
