use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::command::CommandExecutor;
use crate::config::SweepConfig;
use crate::error::SweepIssue;
use crate::path_utils;
use crate::sweep::grid::{ConfigGrid, SweepTarget, Trial};
use crate::sweep::monitor::ResourceMonitor;
use crate::sweep::store::ResultStore;

/// What a sweep did
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Prover invocations that ran to completion, whatever their exit status
    pub trials: usize,
    /// Trials whose prover exited unsuccessfully
    pub nonzero_exits: usize,
    /// (bench, addr, size) groups skipped for missing inputs
    pub skipped_groups: usize,
    pub issues: Vec<SweepIssue>,
}

/// Runs every trial of the sweep, one at a time
pub struct RunExecutor {
    config: SweepConfig,
    store: ResultStore,
    monitor: ResourceMonitor,
}

impl RunExecutor {
    pub fn new(config: SweepConfig) -> Self {
        let store = ResultStore::from_config(&config);
        let monitor =
            ResourceMonitor::new(Duration::from_millis(config.measure.sample_interval_ms));
        Self {
            config,
            store,
            monitor,
        }
    }

    /// Execute the whole sweep.
    ///
    /// Repetition `r` of a configuration starts only after repetition `r - 1`
    /// has exited. Missing inputs and failing provers are recorded in the
    /// summary; only environment failures return an error.
    pub fn run(&self) -> Result<SweepSummary> {
        let prover = &self.config.prover;
        if !path_utils::is_bare_command(prover) && !prover.exists() {
            anyhow::bail!("Prover binary not found at {}", prover.display());
        }

        path_utils::ensure_directory(self.store.root())?;
        crate::system_info::dump_sys_info(&self.store.root().join("system_info"))?;

        let grid = ConfigGrid::new(self.config.grid.clone());
        let runs = self.config.runs;
        let trials_per_group = (grid.params_per_group() * runs as usize) as u64;
        info!(
            "Sweeping {} configurations x {} runs into {}",
            grid.len(),
            runs,
            self.store.root().display()
        );

        let progress = self.progress_bar(grid.len() as u64 * runs as u64)?;
        let mut summary = SweepSummary::default();
        let mut skipped = Vec::new();

        let targets = grid.targets(&self.store, |issue| {
            progress.dec_length(trials_per_group);
            skipped.push(issue);
        });

        for target in targets {
            info!("Running configuration: {}", target.config);
            for trial in target.config.trials(runs) {
                if let Some(issue) = self.run_trial(&target, &trial)? {
                    summary.nonzero_exits += 1;
                    summary.issues.push(issue);
                }
                summary.trials += 1;
                progress.inc(1);
            }
        }
        progress.finish();

        summary.skipped_groups = skipped.len();
        summary.issues.extend(skipped);

        info!(
            "Sweep finished: {} trials, {} nonzero exits, {} skipped groups",
            summary.trials, summary.nonzero_exits, summary.skipped_groups
        );
        Ok(summary)
    }

    fn progress_bar(&self, total: u64) -> Result<ProgressBar> {
        if !self.config.progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:60.magenta/black}] {pos}/{len} trials ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("⟨⟨⟨⟨⟨····· "),
        );
        Ok(pb)
    }

    /// Run one trial, returning an issue when the prover exits unsuccessfully
    fn run_trial(&self, target: &SweepTarget, trial: &Trial) -> Result<Option<SweepIssue>> {
        let trial_dir = self.store.trial_dir(trial);
        path_utils::ensure_directory(&trial_dir)?;

        let stdout_path = self.store.stdout_path(trial);
        let stderr_path = self.store.stderr_path(trial);
        let stdout = File::create(&stdout_path)
            .with_context(|| format!("Failed to create {stdout_path:?}"))?;
        let stderr = File::create(&stderr_path)
            .with_context(|| format!("Failed to create {stderr_path:?}"))?;

        let executor = CommandExecutor::builder()
            .wrapper(self.config.measure.wrapper.clone())
            .env_var("PROOFSWEEP_RUN", trial.run.to_string())
            .env_var("PROOFSWEEP_BENCH", trial.config.bench.clone())
            .build()?;

        let prover = self.config.prover.to_string_lossy();
        let graph = target.inputs.graph.to_string_lossy();
        let path = target.inputs.path.to_string_lossy();
        let num_queries = trial.config.num_queries.to_string();
        let blowup_factor = trial.config.blowup_factor.to_string();
        let grinding_factor = trial.config.grinding_factor.to_string();
        let args = [
            graph.as_ref(),
            path.as_ref(),
            num_queries.as_str(),
            blowup_factor.as_str(),
            grinding_factor.as_str(),
        ];

        debug!("Trial {trial} -> {}", trial_dir.display());
        let started = Instant::now();
        let child = executor.launch_redirected(&prover, &args, stdout, stderr)?;
        let (status, report) = self.monitor.watch(child, started)?;
        report.write_json(&self.store.resources_path(trial))?;

        if status.success() {
            return Ok(None);
        }

        let issue = SweepIssue::ProcessNonzeroExit {
            trial: trial.to_string(),
            code: status.code(),
        };
        warn!("{issue}");
        let mut stderr_log = OpenOptions::new()
            .append(true)
            .open(&stderr_path)
            .with_context(|| format!("Failed to reopen {stderr_path:?}"))?;
        writeln!(stderr_log, "proofsweep: {issue}")?;
        Ok(Some(issue))
    }
}
