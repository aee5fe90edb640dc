//! Outputs of a completed run.

use crate::config::Params;
use crate::engine::Outcome;
use crate::market::AffordabilityMask;
use crate::stats::{Accumulator, AccumulatorReport, compute_gini};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Everything a run produced, together with the parameters that produced it.
///
/// Fields are read-only; derived metrics are computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    params: Params,
    incomes: Vec<f64>,
    mask: AffordabilityMask,
    adopted: Vec<bool>,
    initial_adopters: Vec<usize>,
    timeline: Vec<usize>,
}

/// Summary of a run, as shown to a reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub population_size: usize,
    pub addressable_market: usize,
    pub addressable_share: f64,
    pub final_adopters: usize,
    pub market_penetration: f64,
    pub takeoff_period: Option<usize>,
    pub income: IncomeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub gini: f64,
}

impl SimulationResult {
    pub fn new(params: Params, incomes: Vec<f64>, mask: AffordabilityMask, outcome: Outcome) -> Self {
        Self {
            params,
            incomes,
            mask,
            adopted: outcome.adopted,
            initial_adopters: outcome.initial_adopters,
            timeline: outcome.timeline,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn incomes(&self) -> &[f64] {
        &self.incomes
    }

    pub fn affordable(&self) -> &[bool] {
        self.mask.as_slice()
    }

    pub fn adopted(&self) -> &[bool] {
        &self.adopted
    }

    pub fn initial_adopters(&self) -> &[usize] {
        &self.initial_adopters
    }

    /// Adopter count at the start of every period.
    pub fn timeline(&self) -> &[usize] {
        &self.timeline
    }

    pub fn addressable_market(&self) -> usize {
        self.mask.n_affordable()
    }

    /// Adopters at the last recorded period.
    pub fn final_adopters(&self) -> usize {
        self.timeline.last().copied().unwrap_or_default()
    }

    /// Final adopters as a percentage of the addressable market, zero if it is empty.
    pub fn market_penetration(&self) -> f64 {
        let n_affordable = self.addressable_market();
        if n_affordable == 0 {
            return 0.0;
        }
        100.0 * self.final_adopters() as f64 / n_affordable as f64
    }

    /// Addressable market as a percentage of the population.
    pub fn addressable_share(&self) -> f64 {
        if self.incomes.is_empty() {
            return 0.0;
        }
        100.0 * self.addressable_market() as f64 / self.incomes.len() as f64
    }

    /// Adopters gained between consecutive periods.
    pub fn new_adopters(&self) -> Vec<usize> {
        self.timeline
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .collect()
    }

    /// Period at whose end the most agents adopted, if any did.
    ///
    /// Ties resolve to the earliest period.
    pub fn takeoff_period(&self) -> Option<usize> {
        self.new_adopters()
            .into_iter()
            .enumerate()
            .filter(|&(_, n_new)| n_new > 0)
            .fold(None, |best: Option<(usize, usize)>, (period, n_new)| match best {
                Some((_, best_new)) if best_new >= n_new => best,
                _ => Some((period, n_new)),
            })
            .map(|(period, _)| period)
    }

    pub fn income_summary(&self) -> IncomeSummary {
        let AccumulatorReport {
            mean,
            std_dev,
            min,
            max,
            ..
        } = self.incomes.iter().copied().collect::<Accumulator>().report();
        IncomeSummary {
            mean,
            std_dev,
            min,
            max,
            gini: compute_gini(&self.incomes),
        }
    }

    pub fn report(&self) -> Report {
        Report {
            population_size: self.incomes.len(),
            addressable_market: self.addressable_market(),
            addressable_share: self.addressable_share(),
            final_adopters: self.final_adopters(),
            market_penetration: self.market_penetration(),
            takeoff_period: self.takeoff_period(),
            income: self.income_summary(),
        }
    }

    /// Write the result to a MessagePack file.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize result")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Read a result previously written by [`SimulationResult::save`].
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let result = decode::from_read(&mut reader).context("failed to deserialize result")?;
        Ok(result)
    }
}
