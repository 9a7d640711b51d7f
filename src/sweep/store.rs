use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::SweepConfig;
use crate::error::{InputKind, SweepIssue};
use crate::path_utils;
use crate::sweep::grid::Trial;

pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";
pub const RESOURCES_LOG: &str = "resources.json";

/// Directory layout of the result tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `<bench>/addr_<a>_size_<s>/q<nq>_b<bf>_g<gr>/run_<r>`
    #[default]
    Nested,
    /// `<bench>/run_<r>`, for sweeps with a single parameter point
    Flat,
}

/// The two input artifacts the prover reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverInputs {
    pub graph: PathBuf,
    pub path: PathBuf,
}

/// Path-addressed store of trial logs.
///
/// There is no index besides the directory hierarchy: every path is a pure
/// function of the trial's fields.
#[derive(Debug, Clone)]
pub struct ResultStore {
    root: PathBuf,
    layout: Layout,
    graph_template: String,
    path_template: String,
}

impl ResultStore {
    pub fn new(
        root: impl Into<PathBuf>,
        layout: Layout,
        graph_template: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            layout,
            graph_template: graph_template.into(),
            path_template: path_template.into(),
        }
    }

    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(
            &config.logs_dir,
            config.layout,
            &config.graph_input,
            &config.path_input,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every artifact of one trial
    pub fn trial_dir(&self, trial: &Trial) -> PathBuf {
        let config = &trial.config;
        let bench_dir = self.root.join(&config.bench);
        let run_dir = format!("run_{}", trial.run);
        match self.layout {
            Layout::Nested => bench_dir
                .join(format!("addr_{}_size_{}", config.addr, config.size))
                .join(format!(
                    "q{}_b{}_g{}",
                    config.num_queries, config.blowup_factor, config.grinding_factor
                ))
                .join(run_dir),
            Layout::Flat => bench_dir.join(run_dir),
        }
    }

    pub fn stdout_path(&self, trial: &Trial) -> PathBuf {
        self.trial_dir(trial).join(STDOUT_LOG)
    }

    pub fn stderr_path(&self, trial: &Trial) -> PathBuf {
        self.trial_dir(trial).join(STDERR_LOG)
    }

    pub fn resources_path(&self, trial: &Trial) -> PathBuf {
        self.trial_dir(trial).join(RESOURCES_LOG)
    }

    /// Resolve the input artifacts of a (bench, addr, size) group
    pub fn input_paths(&self, bench: &str, addr: u32, size: u32) -> ProverInputs {
        let mut vars = HashMap::new();
        vars.insert("bench", bench.to_string());
        vars.insert("addr", addr.to_string());
        vars.insert("size", size.to_string());
        ProverInputs {
            graph: path_utils::render_template(&self.graph_template, &vars),
            path: path_utils::render_template(&self.path_template, &vars),
        }
    }

    /// Like [`Self::input_paths`], failing when either artifact is absent
    pub fn locate_inputs(&self, bench: &str, addr: u32, size: u32) -> Result<ProverInputs, SweepIssue> {
        let inputs = self.input_paths(bench, addr, size);
        for (kind, path) in [(InputKind::Graph, &inputs.graph), (InputKind::Path, &inputs.path)] {
            if !path.is_file() {
                return Err(SweepIssue::MissingInputArtifact {
                    kind,
                    bench: bench.to_string(),
                    addr,
                    size,
                    path: path.clone(),
                });
            }
        }
        Ok(inputs)
    }
}
