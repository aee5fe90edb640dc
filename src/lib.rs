//! Agent-based simulation of technology adoption under income inequality.
//!
//! Agents draw a heavy-tailed income, those above an affordability threshold
//! form the addressable market, and adoption spreads through it driven by an
//! innovation term `p` and a network-effect term `q` scaled by the current
//! adoption fraction.
//!
//! ```no_run
//! use adoptsim::{Execution, Params, simulate};
//!
//! let result = simulate(&Params::default(), Execution::Sequential)?;
//! println!("penetration: {:.1}%", result.market_penetration());
//! # Ok::<(), adoptsim::SimError>(())
//! ```

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod income;
pub mod manager;
pub mod market;
pub mod result;
pub mod stats;
pub mod streams;

pub use config::{Config, Params, RunOpts};
pub use engine::{Execution, Outcome, Simulator};
pub use error::SimError;
pub use market::AffordabilityMask;
pub use result::{Report, SimulationResult};
pub use streams::RandomSource;

/// Perform a complete run: sample incomes, gate the market, and simulate adoption.
///
/// # Errors
/// Fails before any adoption state exists if a parameter is invalid or if
/// the addressable market cannot supply the initial adopters.
pub fn simulate(params: &Params, execution: Execution) -> Result<SimulationResult, SimError> {
    params.validate()?;

    let source = RandomSource::new(params.random_seed);
    let incomes =
        income::sample_incomes(params.population_size, params.gini, &mut source.income_rng())?;
    let mask = AffordabilityMask::new(&incomes, params.income_threshold)?;

    let outcome = Simulator::new(params, &mask, &source, execution)?.run();

    Ok(SimulationResult::new(params.clone(), incomes, mask, outcome))
}
