use serde::{Deserialize, Serialize};
use anyhow::Result;
use std::path::Path;

// Grid dimensions, in cells
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
}

// Agent population, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    pub num_agents: u32,
    pub num_groups: u32,
    pub satisfaction_threshold: f64,
    // Omit for a run seeded from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

// Configuration for the step loop
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    pub total_steps: u32,
    #[serde(default = "default_record_interval_steps")]
    pub record_interval_steps: u32,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Bincode,
    MessagePack,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Bincode => "bin",
            OutputFormat::MessagePack => "msgpack",
        }
    }
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_true")]
    pub save_stats: bool,
    #[serde(default)]
    pub save_csv: bool,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_stats: true,
            save_csv: false,
            format: OutputFormat::Json,
        }
    }
}

fn default_record_interval_steps() -> u32 {
    100
}

fn default_base_filename() -> String {
    "segregation".to_string()
}

fn default_true() -> bool {
    true
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.world.width == 0 || self.world.height == 0 {
            anyhow::bail!("world width and height must be greater than 0.");
        }
        if self.world.width > i32::MAX as u32 || self.world.height > i32::MAX as u32 {
            anyhow::bail!("world dimensions must fit in a signed 32-bit coordinate.");
        }
        if self.population.num_groups == 0 {
            anyhow::bail!("num_groups must be greater than 0.");
        }
        let threshold = self.population.satisfaction_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("satisfaction_threshold must lie in [0, 1], got {}.", threshold);
        }
        // Random placement retries until it hits an empty cell, forever on a full grid.
        let capacity = self.world.width as u64 * self.world.height as u64;
        if self.population.num_agents as u64 > capacity {
            anyhow::bail!(
                "num_agents ({}) exceeds the number of cells ({}); placement would never terminate.",
                self.population.num_agents,
                capacity
            );
        }
        Ok(())
    }

    pub fn cell_count(&self) -> u64 {
        self.world.width as u64 * self.world.height as u64
    }
}
