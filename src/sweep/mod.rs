mod executor;
pub use executor::{RunExecutor, SweepSummary};
mod grid;
pub use grid::{ConfigGrid, ConfigIter, Configuration, SweepTarget, SweepTargets, Trial};
mod monitor;
pub use monitor::{ResourceMonitor, ResourceReport};
mod store;
pub use store::{Layout, ProverInputs, ResultStore, RESOURCES_LOG, STDERR_LOG, STDOUT_LOG};
