use crate::config::Params;
use crate::error::SimError;
use crate::market::AffordabilityMask;
use crate::streams::RandomSource;
use rand::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use std::ops::Range;

/// Agents evaluated together by one worker.
const BLOCK_LEN: usize = 256;

/// How the agents of a single step are evaluated.
///
/// The outcome of a run never depends on this choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    #[default]
    Sequential,
    Parallel {
        n_threads: usize,
    },
}

impl Execution {
    pub fn with_threads(n_threads: usize) -> Self {
        if n_threads <= 1 {
            Self::Sequential
        } else {
            Self::Parallel { n_threads }
        }
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub adopted: Vec<bool>,
    pub initial_adopters: Vec<usize>,
    pub timeline: Vec<usize>,
}

/// Adoption engine.
///
/// Owns the adoption state of every agent and advances it period by period.
/// Within a period all agents see the adoption fraction of the start of the
/// period: new adopters are first selected, then committed together.
pub struct Simulator<'a> {
    params: &'a Params,
    mask: &'a AffordabilityMask,
    source: &'a RandomSource,
    pool: Option<ThreadPool>,

    adopted: Vec<bool>,
    n_adopted: usize,
    initial_adopters: Vec<usize>,
    timeline: Vec<usize>,
}

impl<'a> Simulator<'a> {
    /// Validate the setup and seed the initial adopters.
    ///
    /// # Errors
    /// Returns [`SimError::InvalidParameter`] for an invalid configuration and
    /// [`SimError::InsufficientMarket`] if fewer agents can afford the
    /// technology than initial adopters are required.
    pub fn new(
        params: &'a Params,
        mask: &'a AffordabilityMask,
        source: &'a RandomSource,
        execution: Execution,
    ) -> Result<Self, SimError> {
        params.validate()?;

        let n_agt = params.population_size;
        if mask.len() != n_agt {
            return Err(SimError::invalid(
                "population_size",
                format!("mask covers {} agents, but population is {n_agt}", mask.len()),
            ));
        }

        let required = params.n_initial_adopters();
        let available = mask.n_affordable();
        if available < required {
            return Err(SimError::InsufficientMarket {
                required,
                available,
            });
        }

        let pool = match execution {
            Execution::Sequential => None,
            Execution::Parallel { n_threads } => Some(
                ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .build()
                    .map_err(|error| SimError::invalid("n_threads", error.to_string()))?,
            ),
        };

        // Sample without replacement among affordable agents only.
        let mut seeding_rng = source.seeding_rng();
        let mut initial_adopters: Vec<usize> = mask
            .affordable_indices()
            .choose_multiple(&mut seeding_rng, required)
            .copied()
            .collect();
        initial_adopters.sort_unstable();

        let mut adopted = vec![false; n_agt];
        for &i_agt in &initial_adopters {
            adopted[i_agt] = true;
        }

        log::info!(
            "seeded {} initial adopters in an addressable market of {available} out of {n_agt} agents",
            initial_adopters.len()
        );

        Ok(Self {
            params,
            mask,
            source,
            pool,
            adopted,
            n_adopted: required,
            initial_adopters,
            timeline: Vec::with_capacity(params.time_periods),
        })
    }

    /// Run every remaining period and return the final state.
    pub fn run(mut self) -> Outcome {
        while self.advance() {}

        log::info!(
            "completed {} periods with {} adopters",
            self.timeline.len(),
            self.n_adopted
        );

        Outcome {
            adopted: self.adopted,
            initial_adopters: self.initial_adopters,
            timeline: self.timeline,
        }
    }

    /// Record the current period and apply its update.
    ///
    /// The update that would follow the last recorded period is never
    /// observed and is skipped. Returns `false` once all periods are recorded.
    pub fn advance(&mut self) -> bool {
        let step = self.timeline.len();
        let n_periods = self.params.time_periods;
        if step >= n_periods {
            return false;
        }

        self.timeline.push(self.n_adopted);
        log::debug!("period {step:04}: {} adopters", self.n_adopted);

        if step + 1 < n_periods {
            let new_adopters = self.select_adopters(step);
            self.commit(&new_adopters);
        }

        self.timeline.len() < n_periods
    }

    pub fn adopted(&self) -> &[bool] {
        &self.adopted
    }

    pub fn n_adopted(&self) -> usize {
        self.n_adopted
    }

    pub fn initial_adopters(&self) -> &[usize] {
        &self.initial_adopters
    }

    pub fn timeline(&self) -> &[usize] {
        &self.timeline
    }

    /// Probability of adoption for every eligible agent at the current state.
    ///
    /// Not clamped: values above one make every eligible agent adopt.
    pub fn adoption_prob(&self) -> f64 {
        let frac = self.n_adopted as f64 / self.adopted.len() as f64;
        self.params.p + self.params.q * frac
    }

    fn select_adopters(&self, step: usize) -> Vec<usize> {
        let prob = self.adoption_prob();

        let n_agt = self.adopted.len();
        let blocks: Vec<Range<usize>> = (0..n_agt)
            .step_by(BLOCK_LEN)
            .map(|start| start..usize::min(start + BLOCK_LEN, n_agt))
            .collect();

        match &self.pool {
            None => blocks
                .into_iter()
                .flat_map(|block| self.select_in_block(step, prob, block))
                .collect(),
            Some(pool) => pool.install(|| {
                blocks
                    .into_par_iter()
                    .flat_map_iter(|block| self.select_in_block(step, prob, block))
                    .collect()
            }),
        }
    }

    fn select_in_block(&self, step: usize, prob: f64, block: Range<usize>) -> Vec<usize> {
        let draws = self.source.step_draws(step, block.clone());
        block
            .zip(draws)
            .filter(|&(i_agt, draw)| {
                !self.adopted[i_agt] && self.mask.is_affordable(i_agt) && draw < prob
            })
            .map(|(i_agt, _)| i_agt)
            .collect()
    }

    fn commit(&mut self, new_adopters: &[usize]) {
        for &i_agt in new_adopters {
            debug_assert!(!self.adopted[i_agt] && self.mask.is_affordable(i_agt));
            self.adopted[i_agt] = true;
        }
        self.n_adopted += new_adopters.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::income::sample_incomes;
    use std::collections::BTreeSet;

    struct Setup {
        params: Params,
        mask: AffordabilityMask,
        source: RandomSource,
    }

    impl Setup {
        fn new(params: Params) -> Self {
            let source = RandomSource::new(params.random_seed);
            let incomes =
                sample_incomes(params.population_size, params.gini, &mut source.income_rng())
                    .expect("failed to sample incomes");
            let mask = AffordabilityMask::new(&incomes, params.income_threshold)
                .expect("failed to build mask");
            Self {
                params,
                mask,
                source,
            }
        }

        fn simulator(&self, execution: Execution) -> Simulator<'_> {
            Simulator::new(&self.params, &self.mask, &self.source, execution)
                .expect("failed to construct simulator")
        }
    }

    #[test]
    fn reference_scenario() {
        let setup = Setup::new(Params::default());
        let outcome = setup.simulator(Execution::Sequential).run();

        assert_eq!(outcome.timeline.len(), 30);
        assert_eq!(outcome.timeline[0], 10);
        assert_eq!(outcome.initial_adopters.len(), 10);
        assert!(outcome.timeline.windows(2).all(|w| w[0] <= w[1]));
        assert!(outcome.timeline[29] <= setup.mask.n_affordable());
    }

    #[test]
    fn initial_adopters_are_distinct_and_affordable() {
        let setup = Setup::new(Params {
            population_size: 3000,
            ..Params::default()
        });
        let sim = setup.simulator(Execution::Sequential);
        let unique: BTreeSet<_> = sim.initial_adopters().iter().collect();
        assert_eq!(unique.len(), 30);
        assert!(sim.initial_adopters().iter().all(|&i| setup.mask.is_affordable(i)));
        assert_eq!(sim.n_adopted(), 30);
        assert_eq!(sim.adopted().iter().filter(|&&a| a).count(), 30);
    }

    #[test]
    fn adoption_implies_affordability_at_every_period() {
        let setup = Setup::new(Params {
            p: 0.08,
            q: 0.7,
            time_periods: 40,
            ..Params::default()
        });
        let mut sim = setup.simulator(Execution::Sequential);
        loop {
            let more = sim.advance();
            let adopted = sim.adopted();
            assert!((0..adopted.len()).all(|i| !adopted[i] || setup.mask.is_affordable(i)));
            assert_eq!(adopted.iter().filter(|&&a| a).count(), sim.n_adopted());
            if !more {
                break;
            }
        }
        assert_eq!(sim.timeline().len(), 40);
        assert!(!sim.advance());
        assert_eq!(sim.timeline().len(), 40);
    }

    #[test]
    fn single_period_applies_no_update() {
        let setup = Setup::new(Params {
            p: 1.0,
            time_periods: 1,
            ..Params::default()
        });
        let outcome = setup.simulator(Execution::Sequential).run();
        assert_eq!(outcome.timeline, vec![10]);
        assert_eq!(outcome.adopted.iter().filter(|&&a| a).count(), 10);
    }

    #[test]
    fn unclamped_probability_saturates_the_market() {
        let setup = Setup::new(Params {
            p: 0.5,
            q: 5.0,
            time_periods: 5,
            ..Params::default()
        });
        let mut sim = setup.simulator(Execution::Sequential);
        sim.advance();
        sim.advance();
        assert!(sim.adoption_prob() > 1.0);
        let outcome = sim.run();
        let n_affordable = setup.mask.n_affordable();
        assert_eq!(outcome.timeline[2..], [n_affordable, n_affordable, n_affordable]);
    }

    #[test]
    fn saturated_market_keeps_recording() {
        let setup = Setup::new(Params {
            p: 1.0,
            q: 0.0,
            time_periods: 12,
            ..Params::default()
        });
        let outcome = setup.simulator(Execution::Sequential).run();
        let n_affordable = setup.mask.n_affordable();
        assert_eq!(outcome.timeline.len(), 12);
        assert_eq!(outcome.timeline[0], 10);
        assert!(outcome.timeline[1..].iter().all(|&n| n == n_affordable));
    }

    #[test]
    fn zero_strengths_freeze_adoption() {
        let setup = Setup::new(Params {
            p: 0.0,
            q: 0.0,
            ..Params::default()
        });
        let outcome = setup.simulator(Execution::Sequential).run();
        assert!(outcome.timeline.iter().all(|&n| n == 10));
    }

    #[test]
    fn step_selection_is_order_independent() {
        let setup = Setup::new(Params {
            population_size: 2000,
            ..Params::default()
        });
        let sim = setup.simulator(Execution::Sequential);
        let prob = sim.adoption_prob();
        let step = 0;

        let forward: BTreeSet<usize> = sim.select_adopters(step).into_iter().collect();

        let mut order: Vec<usize> = (0..2000).collect();
        order.shuffle(&mut RandomSource::new(99).seeding_rng());
        let shuffled: BTreeSet<usize> = order
            .into_iter()
            .flat_map(|i_agt| sim.select_in_block(step, prob, i_agt..i_agt + 1))
            .collect();

        assert_eq!(forward, shuffled);
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let setup = Setup::new(Params {
            population_size: 5000,
            time_periods: 24,
            ..Params::default()
        });
        let sequential = setup.simulator(Execution::Sequential).run();
        for n_threads in [2, 3, 8] {
            let parallel = setup.simulator(Execution::with_threads(n_threads)).run();
            assert_eq!(parallel, sequential);
        }
    }

    #[test]
    fn insufficient_market_is_reported() {
        let setup = Setup::new(Params {
            population_size: 100,
            gini: 0.2,
            income_threshold: 30000.0,
            ..Params::default()
        });
        assert_eq!(setup.mask.n_affordable(), 1);
        let result = Simulator::new(&setup.params, &setup.mask, &setup.source, Execution::Sequential);
        assert_eq!(
            result.err(),
            Some(SimError::InsufficientMarket {
                required: 10,
                available: 1
            })
        );
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let params = Params::default();
        let mask = AffordabilityMask::new(&[1.0; 20], 0.0).expect("failed to build mask");
        let source = RandomSource::new(0);
        assert!(matches!(
            Simulator::new(&params, &mask, &source, Execution::Sequential),
            Err(SimError::InvalidParameter { name: "population_size", .. })
        ));
    }
}
