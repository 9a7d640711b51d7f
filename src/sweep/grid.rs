use log::warn;
use std::fmt;

use crate::config::GridConfig;
use crate::error::SweepIssue;
use crate::sweep::store::{ProverInputs, ResultStore};

/// One point of the sweep
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub bench: String,
    pub addr: u32,
    pub size: u32,
    pub num_queries: u32,
    pub blowup_factor: u32,
    pub grinding_factor: u32,
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} addr={} size={} q={} b={} g={}",
            self.bench,
            self.addr,
            self.size,
            self.num_queries,
            self.blowup_factor,
            self.grinding_factor
        )
    }
}

/// A single invocation of the prover for a configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trial {
    pub config: Configuration,
    /// Repetition index, starting at 1
    pub run: u32,
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} run={}", self.config, self.run)
    }
}

impl Configuration {
    /// The trials of this configuration, in execution order
    pub fn trials(&self, runs: u32) -> impl Iterator<Item = Trial> + '_ {
        (1..=runs).map(move |run| Trial {
            config: self.clone(),
            run,
        })
    }
}

/// A configuration whose input artifacts were found
#[derive(Debug, Clone)]
pub struct SweepTarget {
    pub config: Configuration,
    pub inputs: ProverInputs,
}

/// Cartesian product of the sweep dimensions.
///
/// Configurations are produced lazily by decoding a flat index, so iteration
/// never materializes the product and can be restarted at will. The bench
/// dimension varies slowest, grinding factor fastest.
#[derive(Debug, Clone)]
pub struct ConfigGrid {
    dims: GridConfig,
}

impl ConfigGrid {
    pub fn new(dims: GridConfig) -> Self {
        Self { dims }
    }

    /// Number of (bench, addr, size) groups
    pub fn group_count(&self) -> usize {
        self.dims.benches.len() * self.dims.addresses.len() * self.dims.sizes.len()
    }

    /// Number of protocol parameter combinations within one group
    pub fn params_per_group(&self) -> usize {
        self.dims.num_queries.len() * self.dims.blowup_factors.len() * self.dims.grinding_factors.len()
    }

    /// Total number of configurations
    pub fn len(&self) -> usize {
        self.group_count() * self.params_per_group()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every configuration, in nested order
    pub fn iter(&self) -> ConfigIter<'_> {
        ConfigIter {
            grid: self,
            next: 0,
            end: self.len(),
        }
    }

    /// Configurations whose input artifacts exist.
    ///
    /// Inputs are checked once per (bench, addr, size) group; a group with a
    /// missing artifact is skipped whole and reported through `on_skip`.
    pub fn targets<'a, F>(&'a self, store: &'a ResultStore, on_skip: F) -> SweepTargets<'a, F>
    where
        F: FnMut(SweepIssue),
    {
        SweepTargets {
            grid: self,
            store,
            on_skip,
            group: 0,
            param: 0,
            inputs: None,
        }
    }

    fn group_at(&self, group: usize) -> (&str, u32, u32) {
        let sizes = self.dims.sizes.len();
        let addresses = self.dims.addresses.len();
        let size = self.dims.sizes[group % sizes];
        let addr = self.dims.addresses[(group / sizes) % addresses];
        let bench = self.dims.benches[group / (sizes * addresses)].as_str();
        (bench, addr, size)
    }

    fn config_at(&self, group: usize, param: usize) -> Configuration {
        let (bench, addr, size) = self.group_at(group);
        let grinding = self.dims.grinding_factors.len();
        let blowup = self.dims.blowup_factors.len();
        Configuration {
            bench: bench.to_string(),
            addr,
            size,
            num_queries: self.dims.num_queries[param / (grinding * blowup)],
            blowup_factor: self.dims.blowup_factors[(param / grinding) % blowup],
            grinding_factor: self.dims.grinding_factors[param % grinding],
        }
    }
}

/// Lazy iterator over all configurations of a grid
pub struct ConfigIter<'a> {
    grid: &'a ConfigGrid,
    next: usize,
    end: usize,
}

impl Iterator for ConfigIter<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let per_group = self.grid.params_per_group();
        let config = self
            .grid
            .config_at(self.next / per_group, self.next % per_group);
        self.next += 1;
        Some(config)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ConfigIter<'_> {}

/// Lazy iterator over the configurations that can actually be executed
pub struct SweepTargets<'a, F> {
    grid: &'a ConfigGrid,
    store: &'a ResultStore,
    on_skip: F,
    group: usize,
    param: usize,
    inputs: Option<ProverInputs>,
}

impl<F> Iterator for SweepTargets<'_, F>
where
    F: FnMut(SweepIssue),
{
    type Item = SweepTarget;

    fn next(&mut self) -> Option<Self::Item> {
        let per_group = self.grid.params_per_group();
        loop {
            if self.group >= self.grid.group_count() {
                return None;
            }

            if self.inputs.is_none() {
                let (bench, addr, size) = self.grid.group_at(self.group);
                match self.store.locate_inputs(bench, addr, size) {
                    Ok(inputs) => self.inputs = Some(inputs),
                    Err(issue) => {
                        warn!("Skipping {bench} addr={addr} size={size}: {issue}");
                        (self.on_skip)(issue);
                        self.group += 1;
                        continue;
                    }
                }
            }

            if self.param < per_group {
                let config = self.grid.config_at(self.group, self.param);
                self.param += 1;
                let inputs = self.inputs.clone()?;
                return Some(SweepTarget { config, inputs });
            }

            self.group += 1;
            self.param = 0;
            self.inputs = None;
        }
    }
}
