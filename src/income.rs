//! Heavy-tailed income sample.

use crate::config::check_gini;
use crate::error::SimError;
use rand::prelude::*;
use rand_distr::Pareto;

/// Monetary scale of one unit of the Pareto draw.
pub const INCOME_SCALE: f64 = 20_000.0;

/// Draw `n_agt` independent incomes.
///
/// Each income is `INCOME_SCALE * (x - 1)` with `x` Pareto distributed with
/// unit scale and shape `1 / gini` (a Lomax draw), so incomes start at zero
/// and the tail gets heavier as `gini` grows.
pub fn sample_incomes<R: Rng + ?Sized>(
    n_agt: usize,
    gini: f64,
    rng: &mut R,
) -> Result<Vec<f64>, SimError> {
    if n_agt == 0 {
        return Err(SimError::invalid("population_size", "must be positive"));
    }
    check_gini(gini)?;

    let dist = Pareto::new(1.0, 1.0 / gini)
        .map_err(|error| SimError::invalid("gini", error.to_string()))?;

    let incomes = dist
        .sample_iter(rng)
        .take(n_agt)
        .map(|x: f64| INCOME_SCALE * (x - 1.0).max(0.0))
        .collect();

    Ok(incomes)
}
