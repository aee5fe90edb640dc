//! Addressable market.

use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Which agents can afford the technology.
///
/// Computed once per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityMask {
    affordable: Vec<bool>,
    n_affordable: usize,
}

impl AffordabilityMask {
    /// Mark every agent whose income reaches `threshold`.
    pub fn new(incomes: &[f64], threshold: f64) -> Result<Self, SimError> {
        if !(threshold >= 0.0 && threshold.is_finite()) {
            return Err(SimError::invalid(
                "income_threshold",
                format!("must be non-negative and finite, but is {threshold}"),
            ));
        }
        let affordable: Vec<bool> = incomes.iter().map(|&income| income >= threshold).collect();
        let n_affordable = affordable.iter().filter(|&&ok| ok).count();
        Ok(Self {
            affordable,
            n_affordable,
        })
    }

    /// Addressable market size.
    pub fn n_affordable(&self) -> usize {
        self.n_affordable
    }

    pub fn len(&self) -> usize {
        self.affordable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.affordable.is_empty()
    }

    pub fn is_affordable(&self, i_agt: usize) -> bool {
        self.affordable[i_agt]
    }

    /// Indices of the affordable agents, in increasing order.
    pub fn affordable_indices(&self) -> Vec<usize> {
        self.affordable
            .iter()
            .enumerate()
            .filter_map(|(i_agt, &ok)| ok.then_some(i_agt))
            .collect()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.affordable
    }
}
