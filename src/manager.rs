use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Execution;
use crate::simulate;
use anyhow::{Context, Result, bail};
use glob::glob;
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Layout and commands of a simulation directory.
///
/// The directory holds `config.toml`, one `run-XXXX.msgpack` file per
/// completed run, and `analysis.toml` once the runs are analyzed.
pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Perform `n_runs` new runs, numbered after the highest existing one.
    ///
    /// Run `k` uses the configured seed plus `k`.
    pub fn run_sims(&self) -> Result<()> {
        let first_idx = self.next_run_idx().context("failed to find next run index")?;
        let execution = Execution::with_threads(self.cfg.run.n_threads);

        (first_idx..first_idx + self.cfg.run.n_runs)
            .into_par_iter()
            .try_for_each(|run_idx| self.run_sim(run_idx, execution))?;

        Ok(())
    }

    pub fn analyze_sims(&self) -> Result<()> {
        let run_files = self.run_files().context("failed to list run files")?;
        if run_files.is_empty() {
            bail!("no run files found in {:?}", self.sim_dir);
        }

        let mut analyzer = Analyzer::new(self.cfg.model.clone());
        for file in &run_files {
            analyzer
                .add_file(file)
                .with_context(|| format!("failed to add {file:?}"))?;
        }

        let analysis_file = self.analysis_file();
        analyzer
            .save_results(&analysis_file)
            .context("failed to save results")?;
        log::info!("analyzed {} runs into {analysis_file:?}", analyzer.n_results());

        Ok(())
    }

    pub fn clean_sims(&self) -> Result<()> {
        let mut files = self.run_files().context("failed to list run files")?;
        let analysis_file = self.analysis_file();
        if analysis_file.exists() {
            files.push(analysis_file);
        }
        for file in files {
            fs::remove_file(&file).with_context(|| format!("failed to remove {file:?}"))?;
            log::info!("removed {file:?}");
        }
        Ok(())
    }

    fn run_sim(&self, run_idx: usize, execution: Execution) -> Result<()> {
        let seed = self.cfg.model.random_seed.wrapping_add(run_idx as u64);
        let params = self.cfg.model.with_seed(seed);

        let result = simulate(&params, execution)
            .with_context(|| format!("failed to simulate run {run_idx} (seed {seed})"))?;

        let run_file = self.run_file(run_idx);
        result
            .save(&run_file)
            .with_context(|| format!("failed to save {run_file:?}"))?;
        log::info!("saved {run_file:?}");

        let report = result.report();
        log::info!(
            "run {run_idx:04}: population {}, addressable market {} ({:.1}%), final adopters {}, penetration {:.1}%",
            report.population_size,
            report.addressable_market,
            report.addressable_share,
            report.final_adopters,
            report.market_penetration
        );

        Ok(())
    }

    fn run_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<PathBuf> = glob(pattern)
            .context("failed to glob run files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn next_run_idx(&self) -> Result<usize> {
        let next_idx = self
            .run_files()?
            .iter()
            .filter_map(|file| run_idx_of(file))
            .map(|run_idx| run_idx + 1)
            .max()
            .unwrap_or(0);
        Ok(next_idx)
    }

    fn run_file(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}.msgpack"))
    }

    fn analysis_file(&self) -> PathBuf {
        self.sim_dir.join("analysis.toml")
    }
}

fn run_idx_of(file: &Path) -> Option<usize> {
    file.file_stem()?
        .to_str()?
        .strip_prefix("run-")?
        .parse()
        .ok()
}
