use crate::types::OptimizationMode;

/// Errors produced while configuring, running, or persisting a swarm.
///
/// Every variant is a configuration or persistence fault. Degenerate
/// evaluations are not errors: an objective signals them by returning the
/// worst sentinel fitness, which the swarm treats as an ordinary bad result.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a lower bound is greater than its upper bound, or either is not finite.
    #[error("invalid bounds at dimension {index}: low ({low}) must be finite and <= high ({high})")]
    InvalidBounds {
        /// The offending dimension.
        index: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when the lower and upper bound vectors differ in length.
    #[error("bounds length mismatch: {lower} lower bounds but {upper} upper bounds")]
    BoundsLengthMismatch {
        /// Number of lower bounds.
        lower: usize,
        /// Number of upper bounds.
        upper: usize,
    },

    /// Returned when the search space has zero dimensions.
    #[error("bounds must have at least one dimension")]
    EmptyBounds,

    /// Returned when the swarm is configured with zero particles.
    #[error("swarm must contain at least one particle")]
    InvalidSwarmSize,

    /// Returned when no objective function is registered or `num_objectives` is zero.
    #[error("at least one objective is required")]
    NoObjectives,

    /// Returned when a velocity coefficient is not a finite number.
    #[error("invalid hyperparameter {name}: {value}")]
    InvalidHyperparameter {
        /// The hyperparameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Returned when a vector has the wrong number of components.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked.
        what: &'static str,
        /// The expected length.
        expected: usize,
        /// The actual length.
        got: usize,
    },

    /// Returned when the objectives produce the wrong number of values for a particle.
    #[error("objective dimension mismatch: expected {expected} values, got {got}")]
    ObjectiveDimensionMismatch {
        /// The configured number of objectives.
        expected: usize,
        /// The number of values actually produced.
        got: usize,
    },

    /// Returned when a batched objective returns a result for the wrong number of particles.
    #[error("batch size mismatch: expected {expected} results, got {got}")]
    BatchSizeMismatch {
        /// The number of particles in the swarm.
        expected: usize,
        /// The number of results returned.
        got: usize,
    },

    /// Returned when an evaluator is used in the wrong optimization mode.
    #[error("optimization mode mismatch: expected {expected}, got {got}")]
    ModeMismatch {
        /// The required mode.
        expected: OptimizationMode,
        /// The evaluator's mode.
        got: OptimizationMode,
    },

    /// Returned when a checkpoint does not match the caller's bounds or dimensions.
    #[error("checkpoint mismatch for {field}: requested {expected}, checkpoint has {found}")]
    CheckpointMismatch {
        /// The mismatching field.
        field: &'static str,
        /// What the caller requested.
        expected: String,
        /// What the checkpoint contains.
        found: String,
    },

    /// Returned when a checkpoint file is missing or malformed.
    #[error("malformed checkpoint: {0}")]
    Checkpoint(String),

    /// Returned when reading or writing persisted state fails.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
