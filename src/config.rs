use crate::error::SimError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{
        Bound::{Excluded, Included},
        RangeBounds,
    },
    path::Path,
};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Economic parameters of a single simulation run.
///
/// All values are checked by [`Params::validate`] before a run starts.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// Number of agents.
    pub population_size: usize,
    /// Income inequality coefficient, sets the Pareto shape to `1 / gini`.
    pub gini: f64,
    /// Innovation strength.
    pub p: f64,
    /// Network-effect strength.
    pub q: f64,
    /// Minimum income needed to adopt.
    pub income_threshold: f64,
    /// Number of recorded periods.
    pub time_periods: usize,

    /// Seed of every random stream of the run.
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            population_size: 1000,
            gini: 0.45,
            p: 0.02,
            q: 0.45,
            income_threshold: 15000.0,
            time_periods: 30,
            random_seed: DEFAULT_SEED,
        }
    }
}

impl Params {
    /// Check every parameter against its admissible range.
    pub fn validate(&self) -> Result<(), SimError> {
        check_num("population_size", self.population_size, 1..)?;
        check_gini(self.gini)?;
        check_real("p", self.p, 0.0..)?;
        check_real("q", self.q, 0.0..)?;
        check_real("income_threshold", self.income_threshold, 0.0..)?;
        check_num("time_periods", self.time_periods, 1..)?;
        Ok(())
    }

    /// Number of agents adopting before the first period.
    pub fn n_initial_adopters(&self) -> usize {
        usize::max(10, self.population_size / 100)
    }

    /// Same parameters with a different seed.
    pub fn with_seed(&self, random_seed: u64) -> Self {
        Self {
            random_seed,
            ..self.clone()
        }
    }
}

/// Options of the `run` command that do not affect the dynamics.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunOpts {
    /// Replicates created per invocation.
    #[serde(default = "default_one")]
    pub n_runs: usize,
    /// Worker threads used to evaluate a single step.
    #[serde(default = "default_one")]
    pub n_threads: usize,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            n_runs: 1,
            n_threads: 1,
        }
    }
}

/// Contents of a simulation directory's `config.toml`.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub model: Params,
    #[serde(default)]
    pub run: RunOpts,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed,
    /// or if any value is out of range.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.model.validate()?;
        check_num("n_runs", self.run.n_runs, 1..10_000)?;
        check_num("n_threads", self.run.n_threads, 1..1024)?;
        Ok(())
    }
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_one() -> usize {
    1
}

/// A Gini coefficient must lie in `(0, 1]`.
pub(crate) fn check_gini(gini: f64) -> Result<(), SimError> {
    check_real("gini", gini, (Excluded(0.0), Included(1.0)))
}

fn check_num<T, R>(name: &'static str, num: T, range: R) -> Result<(), SimError>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(SimError::invalid(
            name,
            format!("number must be in the range {range:?}, but is {num:?}"),
        ));
    }
    Ok(())
}

fn check_real<R>(name: &'static str, num: f64, range: R) -> Result<(), SimError>
where
    R: RangeBounds<f64> + Debug,
{
    if !num.is_finite() {
        return Err(SimError::invalid(name, format!("number must be finite, but is {num}")));
    }
    check_num(name, num, range)
}
