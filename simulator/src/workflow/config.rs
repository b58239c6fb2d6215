use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tpccore::config::SimulationConfig;

use crate::generator::primary::PrimaryGeneratorConfig;
use crate::workflow::sweep::SweepConfig;

/// Everything a batch run needs, as read from the workflow YAML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub simulation: SimulationConfig,
    /// Deposit table (`.csv` or `.json`). Synthetic tracks are used when unset.
    pub input_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Events to simulate. Empty means every event in the input.
    pub events: Vec<u64>,
    pub n_workers: usize,
    pub generator: PrimaryGeneratorConfig,
    pub sweep: Option<SweepConfig>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            input_path: None,
            output_dir: PathBuf::from("tpc_images"),
            events: Vec::new(),
            n_workers: 1,
            generator: PrimaryGeneratorConfig::default(),
            sweep: None,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Write the default configuration as a starting point for editing.
    pub fn write_template<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        let yaml = serde_yaml::to_string(&WorkflowConfig::default())
            .context("serializing template workflow config")?;
        fs::write(path_ref, yaml)
            .with_context(|| format!("writing template config {}", path_ref.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.n_workers >= 1, "n_workers must be at least 1");
        self.simulation
            .validate()
            .context("invalid simulation parameters")?;
        Ok(())
    }
}
