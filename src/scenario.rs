use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    builder::{CountyRecord, EdgeRecord, NetworkBuilder, Sighting, TreeBanding},
    config::Tuning,
    countermeasures::RunMode,
    engine::{EngineSettings, Iterations},
    months::Month,
    network::Network,
    overlay::Overlay,
};

fn default_lifecycle() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub iterations: Option<Iterations>,
    #[serde(default)]
    pub run_mode: Option<RunMode>,
    /// Run the seasonal life cycle; when false, natural growth stands in.
    #[serde(default = "default_lifecycle")]
    pub lifecycle: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub counties: Vec<CountyRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default)]
    pub tree_banding: Option<TreeBanding>,
    #[serde(default)]
    pub sightings: Vec<Sighting>,
    #[serde(default)]
    pub overlay: Overlay,
    #[serde(default)]
    pub tuning: Tuning,
    /// Named per-month levels, e.g. `temperature: { July: 0.9 }`.
    #[serde(default)]
    pub month_attributes: BTreeMap<String, HashMap<Month, f64>>,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_network(&self) -> Network {
        NetworkBuilder::new()
            .with_counties(self.counties.iter().cloned())
            .with_edges(self.edges.iter().cloned())
            .with_sightings(self.sightings.iter().cloned())
            .with_tree_banding(self.tree_banding.clone())
            .build()
    }

    pub fn iterations(&self, override_iterations: Option<Iterations>) -> Iterations {
        override_iterations
            .or(self.iterations)
            .unwrap_or(Iterations::DEFAULT)
    }

    pub fn run_mode(&self, override_mode: Option<RunMode>) -> RunMode {
        override_mode.or(self.run_mode).unwrap_or(RunMode::Baseline)
    }

    pub fn engine_settings(&self, run_mode: RunMode, seed: u64, lifecycle_enabled: bool) -> EngineSettings {
        EngineSettings {
            scenario_name: self.name.clone(),
            seed,
            run_mode,
            lifecycle_enabled,
            tuning: self.tuning.clone(),
            overlay: self.overlay.clone(),
            month_attributes: self.month_attributes.clone(),
        }
    }
}
