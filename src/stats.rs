use serde::{Deserialize, Serialize};

/// Running mean and variance (Welford), plus extrema.
#[derive(Debug, Clone)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
            min: if self.n_vals > 0 { self.min } else { f64::NAN },
            max: if self.n_vals > 0 { self.max } else { f64::NAN },
        }
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        iter.into_iter().for_each(|val| acc.add(val));
        acc
    }
}

/// Sample Gini coefficient of non-negative values.
///
/// Returns `NAN` for an empty sample or one that sums to zero.
pub fn compute_gini(vals: &[f64]) -> f64 {
    let n_vals = vals.len();
    let sum: f64 = vals.iter().sum();
    if n_vals == 0 || sum <= 0.0 {
        return f64::NAN;
    }

    let mut sorted = vals.to_vec();
    sorted.sort_by(f64::total_cmp);

    // G = 2 * sum_i(i * x_i) / (n * sum) - (n + 1) / n, with ranks from 1.
    let rank_sum: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, &val)| (idx + 1) as f64 * val)
        .sum();
    let n = n_vals as f64;
    2.0 * rank_sum / (n * sum) - (n + 1.0) / n
}
