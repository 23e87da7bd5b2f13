//! Core types for the swarm optimizer.

use serde::{Deserialize, Serialize};

/// How objective functions are invoked each iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    /// Each objective is called once per particle with that particle's position.
    Individual,
    /// Each objective is called once per iteration with every particle's position.
    Global,
}

impl core::fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Individual => f.write_str("individual"),
            Self::Global => f.write_str("global"),
        }
    }
}
