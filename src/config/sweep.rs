use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::traits::{Configuration, PathConfiguration};
use crate::extract::Schema;
use crate::path_utils;
use crate::sweep::Layout;

/// Embench programs the prover is exercised on by default
const DEFAULT_BENCHES: &[&str] = &[
    "aha-mont64",
    "crc32",
    "cubic",
    "edn",
    "huffbench",
    "matmult-int",
    "md5sum",
    "minver",
    "nbody",
    "nettle-aes",
    "nettle-sha256",
    "nsichneu",
    "picojpeg",
    "primecount",
    "qrduino",
    "sglib-combined",
    "slre",
    "st",
    "statemate",
    "tarfind",
    "ud",
    "wikisort",
];

/// The dimensions of the sweep, outermost first
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GridConfig {
    /// Benchmark identifiers
    pub benches: Vec<String>,
    /// Address widths
    pub addresses: Vec<u32>,
    /// Program sizes
    pub sizes: Vec<u32>,
    /// Query counts handed to the prover
    pub num_queries: Vec<u32>,
    /// Evaluation domain blowup factors
    pub blowup_factors: Vec<u32>,
    /// Proof-of-work grinding factors
    pub grinding_factors: Vec<u32>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            benches: DEFAULT_BENCHES.iter().map(|b| b.to_string()).collect(),
            addresses: vec![32],
            sizes: vec![64],
            num_queries: vec![20, 32, 64],
            blowup_factors: vec![16, 32, 64],
            grinding_factors: vec![0, 4],
        }
    }
}

impl GridConfig {
    fn validate(&self) -> Result<()> {
        if self.benches.is_empty() {
            anyhow::bail!("No benches configured");
        }
        for bench in &self.benches {
            if bench.is_empty() {
                anyhow::bail!("Bench name cannot be empty");
            }
            if bench.contains('/') || bench.contains('\\') || bench == "." || bench == ".." {
                anyhow::bail!("Bench name must be a single path component: {bench:?}");
            }
        }

        let dimensions = [
            ("addresses", self.addresses.len()),
            ("sizes", self.sizes.len()),
            ("num_queries", self.num_queries.len()),
            ("blowup_factors", self.blowup_factors.len()),
            ("grinding_factors", self.grinding_factors.len()),
        ];
        for (name, len) in dimensions {
            if len == 0 {
                anyhow::bail!("Sweep dimension '{name}' has no values");
            }
        }
        Ok(())
    }

    /// True when every dimension except the bench list is a single value
    pub fn is_single_point(&self) -> bool {
        self.addresses.len() == 1
            && self.sizes.len() == 1
            && self.num_queries.len() == 1
            && self.blowup_factors.len() == 1
            && self.grinding_factors.len() == 1
    }
}

/// How host resource usage is collected around each prover invocation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MeasureConfig {
    /// Command prefix the prover is launched through, e.g. `["taskset", "-c", "2"]`
    pub wrapper: Option<Vec<String>>,
    /// Interval between process tree samples, in milliseconds
    pub sample_interval_ms: u64,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            wrapper: None,
            sample_interval_ms: 50,
        }
    }
}

/// Complete sweep configuration, defaults baked in and overridable from YAML
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SweepConfig {
    /// Prover executable
    pub prover: PathBuf,
    /// Graph description template, `{bench}`, `{addr}` and `{size}` are substituted
    pub graph_input: String,
    /// Path description template, same placeholders as `graph_input`
    pub path_input: String,
    /// Root of the result tree
    pub logs_dir: PathBuf,
    /// Aggregated table, relative to the working directory unless absolute
    pub output: PathBuf,
    /// Directory layout of the result tree
    pub layout: Layout,
    /// Column set of the aggregated table
    pub schema: Schema,
    /// Repetitions per configuration
    pub runs: u32,
    /// Draw a progress bar while sweeping
    pub progress: bool,
    pub grid: GridConfig,
    pub measure: MeasureConfig,
    /// Path to the config file (set during loading)
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            prover: PathBuf::from("./target/release/starkra"),
            graph_input: "inputs/{bench}/addr_{addr}_size_{size}/numified_adjlist".to_string(),
            path_input: "inputs/{bench}/addr_{addr}_size_{size}/numified_path".to_string(),
            logs_dir: PathBuf::from("logs"),
            output: PathBuf::from("times_summary.csv"),
            layout: Layout::Nested,
            schema: Schema::Current,
            runs: 10,
            progress: true,
            grid: GridConfig::default(),
            measure: MeasureConfig::default(),
            path: None,
        }
    }
}

impl Configuration for SweepConfig {
    fn config_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    fn config_type(&self) -> &str {
        "sweep"
    }

    fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            anyhow::bail!("runs must be at least 1");
        }
        if self.measure.sample_interval_ms == 0 {
            anyhow::bail!("sample_interval_ms cannot be zero");
        }
        if let Some(wrapper) = &self.measure.wrapper {
            if wrapper.is_empty() {
                anyhow::bail!("wrapper cannot be an empty command");
            }
        }
        if self.graph_input.is_empty() || self.path_input.is_empty() {
            anyhow::bail!("Input templates cannot be empty");
        }
        self.grid.validate()?;

        // The flat layout keys trials by bench and run only
        if self.layout == Layout::Flat && !self.grid.is_single_point() {
            anyhow::bail!(
                "The flat layout requires a single value for every dimension except benches"
            );
        }
        Ok(())
    }
}

impl PathConfiguration for SweepConfig {
    fn with_expanded_paths(&self, base_dir: &Path) -> Self {
        let mut config = self.clone();
        path_utils::process_paths(&mut [&mut config.logs_dir], base_dir);
        // A bare prover name is left for PATH lookup at launch
        config.prover = path_utils::expand_path_buf(&config.prover);
        if !path_utils::is_bare_command(&config.prover) {
            config.prover = path_utils::resolve_path(&config.prover, base_dir);
        }
        config.output = path_utils::expand_path_buf(&config.output);

        let base = base_dir.to_string_lossy();
        for template in [&mut config.graph_input, &mut config.path_input] {
            let expanded = path_utils::expand_path_str(template);
            *template = if Path::new(&expanded).is_absolute() || base.is_empty() {
                expanded
            } else {
                base_dir.join(expanded).to_string_lossy().into_owned()
            };
        }
        config
    }
}

/// The built-in configuration, with paths relative to the working directory
pub fn default_config() -> Result<SweepConfig> {
    let config = SweepConfig::default().with_expanded_paths(Path::new(""));
    config.validate()?;
    Ok(config)
}

/// Load sweep configuration from a YAML file
pub fn load_sweep_config(config_path: &Path) -> Result<SweepConfig> {
    if !config_path.exists() {
        anyhow::bail!("Sweep config file not found: {:?}", config_path);
    }

    let config_dir = config_path
        .parent()
        .context("Failed to get sweep config directory")?;

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read sweep config file: {:?}", config_path))?;

    let mut config: SweepConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML from file: {:?}", config_path))?;

    config.path = Some(config_path.to_path_buf());

    let config = config.with_expanded_paths(config_dir);

    config.validate()?;

    debug!("Using {} configuration\n{:?}", config.config_type(), config);
    Ok(config)
}
