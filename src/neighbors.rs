use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::network::{CountyGraph, CountyMap};

/// County name -> canonical neighbor names, resolved through the county map.
///
/// Adjacency is static for a run, so the index is built once at setup and
/// only rebuilt when the county map is replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborIndex {
    entries: BTreeMap<String, Vec<String>>,
}

impl NeighborIndex {
    pub fn build(graph: &CountyGraph, counties: &CountyMap) -> Self {
        let mut entries = BTreeMap::new();
        for name in counties.names() {
            let neighbors = match graph.neighbors(name) {
                Ok(neighbors) => neighbors,
                Err(err) => {
                    warn!(county = name, error = %err, "county has no node in the graph");
                    Vec::new()
                }
            };
            let resolved = neighbors
                .into_iter()
                .filter(|neighbor| {
                    let known = counties.contains(neighbor);
                    if !known {
                        warn!(county = name, neighbor, "skipping neighbor missing from county map");
                    }
                    known
                })
                .map(str::to_string)
                .collect();
            entries.insert(name.to_string(), resolved);
        }
        Self { entries }
    }

    pub fn neighbors(&self, name: &str) -> &[String] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, neighbors)| (name.as_str(), neighbors.as_slice()))
    }

    /// Counties that ended up without any resolvable neighbor.
    pub fn isolated(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, neighbors)| neighbors.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
