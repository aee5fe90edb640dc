use crate::config::Params;
use crate::result::SimulationResult;
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ObsReport {
    Scalar(AccumulatorReport),
    Series(Vec<AccumulatorReport>),
}

/// Quantity accumulated over the results of several runs.
pub trait Obs {
    fn name(&self) -> &'static str;
    fn update(&mut self, result: &SimulationResult);
    fn report(&self) -> ObsReport;
}

pub struct AddressableMarket {
    acc: Accumulator,
}

impl AddressableMarket {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for AddressableMarket {
    fn name(&self) -> &'static str {
        "addressable_market"
    }

    fn update(&mut self, result: &SimulationResult) {
        self.acc.add(result.addressable_market() as f64);
    }

    fn report(&self) -> ObsReport {
        ObsReport::Scalar(self.acc.report())
    }
}

pub struct MarketPenetration {
    acc: Accumulator,
}

impl MarketPenetration {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for MarketPenetration {
    fn name(&self) -> &'static str {
        "market_penetration"
    }

    fn update(&mut self, result: &SimulationResult) {
        self.acc.add(result.market_penetration());
    }

    fn report(&self) -> ObsReport {
        ObsReport::Scalar(self.acc.report())
    }
}

/// Realized Gini coefficient of the income sample.
pub struct IncomeGini {
    acc: Accumulator,
}

impl IncomeGini {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for IncomeGini {
    fn name(&self) -> &'static str {
        "income_gini"
    }

    fn update(&mut self, result: &SimulationResult) {
        let gini = result.income_summary().gini;
        if gini.is_finite() {
            self.acc.add(gini);
        }
    }

    fn report(&self) -> ObsReport {
        ObsReport::Scalar(self.acc.report())
    }
}

/// Takeoff period of the runs that took off.
pub struct TakeoffPeriod {
    acc: Accumulator,
}

impl TakeoffPeriod {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for TakeoffPeriod {
    fn name(&self) -> &'static str {
        "takeoff_period"
    }

    fn update(&mut self, result: &SimulationResult) {
        if let Some(period) = result.takeoff_period() {
            self.acc.add(period as f64);
        }
    }

    fn report(&self) -> ObsReport {
        ObsReport::Scalar(self.acc.report())
    }
}

/// Adopter count of every period across runs.
pub struct AdoptionCurve {
    acc_vec: Vec<Accumulator>,
}

impl AdoptionCurve {
    pub fn new(params: &Params) -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(params.time_periods, Accumulator::new);
        Self { acc_vec }
    }
}

impl Obs for AdoptionCurve {
    fn name(&self) -> &'static str {
        "adoption_curve"
    }

    fn update(&mut self, result: &SimulationResult) {
        for (acc, &n_adopted) in self.acc_vec.iter_mut().zip(result.timeline()) {
            acc.add(n_adopted as f64);
        }
    }

    fn report(&self) -> ObsReport {
        ObsReport::Series(self.acc_vec.iter().map(|acc| acc.report()).collect())
    }
}

/// Aggregates the results of every run sharing one set of model parameters.
pub struct Analyzer {
    params: Params,
    n_results: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(params: Params) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(AddressableMarket::new()),
            Box::new(MarketPenetration::new()),
            Box::new(IncomeGini::new()),
            Box::new(TakeoffPeriod::new()),
            Box::new(AdoptionCurve::new(&params)),
        ];
        Self {
            params,
            n_results: 0,
            obs_ptr_vec,
        }
    }

    pub fn n_results(&self) -> usize {
        self.n_results
    }

    /// Include one result.
    ///
    /// # Errors
    /// Returns an error if the result was produced by different model
    /// parameters; only the seed may differ.
    pub fn add_result(&mut self, result: &SimulationResult) -> Result<()> {
        if result.params().with_seed(self.params.random_seed) != self.params {
            bail!("result parameters differ from the current config");
        }
        for obs in &mut self.obs_ptr_vec {
            obs.update(result);
        }
        self.n_results += 1;
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let result =
            SimulationResult::load(file).with_context(|| format!("failed to load {file:?}"))?;
        self.add_result(&result)
    }

    pub fn reports(&self) -> BTreeMap<&'static str, ObsReport> {
        self.obs_ptr_vec
            .iter()
            .map(|obs| (obs.name(), obs.report()))
            .collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let contents =
            toml::to_string_pretty(&self.reports()).context("failed to serialize reports")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}
