use anyhow::{Context, Result};
use log::{debug, info};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

mod aggregate;
pub use aggregate::{Aggregator, Schema};
mod parser;
pub use parser::LogExtractor;
mod record;
pub use record::{EchoedParameters, MetricRecord, SummaryFields};

use crate::config::SweepConfig;
use crate::error::SweepIssue;
use crate::sweep::{ConfigGrid, ResultStore};

/// What an extraction did
#[derive(Debug, Default)]
pub struct ExtractSummary {
    /// Logs found and scanned
    pub logs_scanned: usize,
    /// Trials without a stdout log
    pub logs_missing: usize,
    /// Rows written to the table
    pub records: usize,
    pub output: PathBuf,
}

/// Read a log, `None` when it does not exist
fn read_log(path: &Path) -> Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read log {path:?}")),
    }
}

/// Rebuild the aggregated table from the result tree.
///
/// Walks every configuration of the grid and every repetition, in sweep
/// order, and appends one row per summary line found. The table is recreated
/// from scratch, so running this twice over the same tree gives the same file.
pub fn collect_results(config: &SweepConfig) -> Result<ExtractSummary> {
    let store = ResultStore::from_config(config);
    let extractor = LogExtractor::new()?;
    let grid = ConfigGrid::new(config.grid.clone());
    let mut aggregator = Aggregator::create(&config.output, config.schema)?;
    let mut summary = ExtractSummary::default();

    info!(
        "Extracting {} configurations x {} runs from {}",
        grid.len(),
        config.runs,
        store.root().display()
    );

    for configuration in grid.iter() {
        for trial in configuration.trials(config.runs) {
            let path = store.stdout_path(&trial);
            let Some(log) = read_log(&path)? else {
                debug!("{}", SweepIssue::MissingLogFile(path));
                summary.logs_missing += 1;
                continue;
            };
            summary.logs_scanned += 1;

            for record in extractor.extract(&trial.config.bench, trial.run, &log) {
                aggregator.append(&record)?;
            }
        }
    }

    summary.records = aggregator.rows();
    summary.output = aggregator.finish()?;
    info!(
        "Wrote {} rows from {} logs to {} ({} logs missing)",
        summary.records,
        summary.logs_scanned,
        summary.output.display(),
        summary.logs_missing
    );
    Ok(summary)
}
