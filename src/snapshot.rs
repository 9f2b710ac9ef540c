//! Persisted network state and the end-of-run snapshot.
//!
//! The graph, the county map and the neighbor index are stored as three
//! independent JSON files so an external builder or consumer can pick up
//! any one of them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::countermeasures::RunMode;
use crate::county::County;
use crate::error::SimResult;
use crate::neighbors::NeighborIndex;
use crate::network::{Corridor, CountyGraph, CountyMap, Network};

const GRAPH_FILE: &str = "graph.json";
const COUNTIES_FILE: &str = "counties.json";
const NEIGHBORS_FILE: &str = "neighbors.json";

pub struct NetworkStore {
    dir: PathBuf,
    prefix: String,
}

impl NetworkStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: String::new(),
        }
    }

    /// Prefix every file name, e.g. `illinois_` for `illinois_graph.json`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn graph_path(&self) -> PathBuf {
        self.path(GRAPH_FILE)
    }

    pub fn counties_path(&self) -> PathBuf {
        self.path(COUNTIES_FILE)
    }

    pub fn neighbors_path(&self) -> PathBuf {
        self.path(NEIGHBORS_FILE)
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, file))
    }

    pub fn save(&self, network: &Network) -> SimResult<()> {
        fs::create_dir_all(&self.dir)?;
        write_json(&self.graph_path(), &network.graph)?;
        write_json(&self.counties_path(), &network.counties)?;
        write_json(&self.neighbors_path(), &network.neighbors)?;
        info!(dir = %self.dir.display(), "network state saved");
        Ok(())
    }

    pub fn load(&self) -> SimResult<Network> {
        let graph: CountyGraph = read_json(&self.graph_path())?;
        let counties: CountyMap = read_json(&self.counties_path())?;
        let neighbors: NeighborIndex = read_json(&self.neighbors_path())?;
        Ok(Network {
            graph,
            counties,
            neighbors,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> SimResult<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> SimResult<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSnapshot {
    pub scenario: String,
    pub run_mode: RunMode,
    pub steps: u64,
    pub written_at: DateTime<Utc>,
    pub counties: Vec<County>,
    pub corridors: Vec<Corridor>,
}

impl FinalSnapshot {
    pub fn capture(scenario: &str, run_mode: RunMode, steps: u64, network: &Network) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_mode,
            steps,
            written_at: Utc::now(),
            counties: network.counties.iter().cloned().collect(),
            corridors: network.graph.corridors().to_vec(),
        }
    }

    /// Write to `<dir>/<scenario>_final.json` and return the path.
    pub fn write(&self, dir: &Path) -> SimResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}_final.json", self.scenario));
        write_json(&path, self)?;
        Ok(path)
    }

    pub fn read(path: &Path) -> SimResult<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Relation;

    fn network() -> Network {
        let mut graph = CountyGraph::new();
        graph.add_node("Cook");
        graph.add_node("Will");
        graph.add_edge("Cook", "Will", Relation::Interstate, 0.5).unwrap();
        graph.set_edge_weight("Cook", "Will", 1.0).unwrap();
        let mut cook = County::new("Cook").with_saturation(0.4).with_densities(0.3, 0.2);
        cook.quarantine = true;
        Network::new(graph, vec![cook, County::new("Will")].into())
    }

    #[test]
    fn blobs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = NetworkStore::new(dir.path()).with_prefix("il_");
        let original = network();
        store.save(&original).unwrap();
        assert!(dir.path().join("il_graph.json").exists());

        let restored = store.load().unwrap();
        let corridor = restored.graph.corridor("Will", "Cook").unwrap();
        assert_eq!(corridor.relation, Relation::Interstate);
        assert_eq!(corridor.weight, 1.0);
        assert_eq!(corridor.base_weight, 0.5);

        let cook = restored.counties.get("Cook").unwrap();
        assert_eq!(cook.saturation, 0.4);
        assert_eq!(cook.toh_density, 0.3);
        assert!(cook.quarantine);
        assert_eq!(restored.neighbors, original.neighbors);
    }

    #[test]
    fn edited_blobs_load_back_within_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let store = NetworkStore::new(dir.path());
        store.save(&network()).unwrap();

        let counties = fs::read_to_string(store.counties_path()).unwrap();
        fs::write(store.counties_path(), counties.replace("0.4", "1.7")).unwrap();
        let graph = r#"{"nodes": ["Cook", "Will"], "corridors": [
            {"a": "Cook", "b": "Will", "relation": "interstate", "weight": 0.5, "base_weight": 0.5},
            {"a": "Will", "b": "Cook", "relation": "interstate", "weight": 0.5, "base_weight": 0.5},
            {"a": "Cook", "b": "Lake", "relation": "adjacent", "weight": 1.0, "base_weight": 1.0}
        ]}"#;
        fs::write(store.graph_path(), graph).unwrap();

        let mut restored = store.load().unwrap();
        restored.refresh_neighbors();
        assert_eq!(restored.graph.edge_count(), 1);
        assert_eq!(restored.neighbors.neighbors("Cook"), ["Will"]);
        let seeded = crate::table::ResultTable::seeded(&restored.counties);
        assert_eq!(seeded.column(0).unwrap(), [1.0, 0.0]);
    }

    #[test]
    fn missing_blob_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = NetworkStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, crate::error::SimulationError::Io(_)));
    }

    #[test]
    fn final_snapshot_is_written_per_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = FinalSnapshot::capture("tri_county", RunMode::Quarantine, 12, &network());
        let path = snapshot.write(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("tri_county_final.json"));

        let restored = FinalSnapshot::read(&path).unwrap();
        assert_eq!(restored.run_mode, RunMode::Quarantine);
        assert_eq!(restored.steps, 12);
        assert_eq!(restored.counties.len(), 2);
        assert_eq!(restored.corridors[0].weight, 1.0);
    }
}
