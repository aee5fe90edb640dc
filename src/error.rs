//! Error taxonomy of the simulation core.

use thiserror::Error;

/// Failure to set up a simulation run.
///
/// Both variants are detected before any adoption state is mutated,
/// so a failed run never produces a partial timeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A configuration value lies outside its admissible range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The addressable market is too small to draw the initial adopters from.
    #[error(
        "addressable market has {available} agents, but {required} initial adopters are required"
    )]
    InsufficientMarket { required: usize, available: usize },
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
