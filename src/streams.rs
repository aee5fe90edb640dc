//! Keyed random streams.
//!
//! Every random quantity of a run is read from a ChaCha12 generator seeded
//! once from the run seed. Independent concerns read from distinct streams,
//! and the draw of agent `i` at step `t` is always the `i`-th `f64` of the
//! stream dedicated to step `t`, whatever order agents are visited in.

use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use std::ops::Range;

const INCOME_STREAM: u64 = 0;
const SEEDING_STREAM: u64 = 1;
const FIRST_STEP_STREAM: u64 = 2;

/// `u32` words consumed by one `f64` draw.
const WORDS_PER_DRAW: u128 = 2;

/// Source of all randomness of one run.
#[derive(Debug, Clone)]
pub struct RandomSource {
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sequential generator for the income sample.
    pub fn income_rng(&self) -> ChaCha12Rng {
        self.stream(INCOME_STREAM)
    }

    /// Sequential generator for picking the initial adopters.
    pub fn seeding_rng(&self) -> ChaCha12Rng {
        self.stream(SEEDING_STREAM)
    }

    /// Uniform `[0, 1)` draws of the agents in `agents` at `step`, in agent order.
    pub fn step_draws(&self, step: usize, agents: Range<usize>) -> StepDraws {
        let mut rng = self.stream(FIRST_STEP_STREAM + step as u64);
        rng.set_word_pos(WORDS_PER_DRAW * agents.start as u128);
        StepDraws {
            rng,
            remaining: agents.len(),
        }
    }

    /// Uniform `[0, 1)` draw of a single agent at `step`.
    pub fn draw(&self, step: usize, agent: usize) -> f64 {
        let mut draws = self.step_draws(step, agent..agent + 1);
        draws.next().unwrap_or_default()
    }

    fn stream(&self, stream: u64) -> ChaCha12Rng {
        let mut rng = ChaCha12Rng::seed_from_u64(self.seed);
        rng.set_stream(stream);
        rng
    }
}

/// Iterator over a contiguous block of per-agent draws.
pub struct StepDraws {
    rng: ChaCha12Rng,
    remaining: usize,
}

impl Iterator for StepDraws {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.rng.random())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StepDraws {}
