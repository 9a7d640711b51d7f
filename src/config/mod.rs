/// Sweep configuration
pub mod sweep;
pub use sweep::{default_config, load_sweep_config, GridConfig, MeasureConfig, SweepConfig};

/// Configuration traits
pub mod traits;
pub use traits::{Configuration, PathConfiguration};
