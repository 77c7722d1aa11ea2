pub mod config;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, WorldConfig, PopulationConfig, TimingConfig, OutputConfig, OutputFormat};
pub use snapshot::MetricsSnapshot;
