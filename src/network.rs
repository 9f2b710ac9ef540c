//! The county adjacency graph and the name-indexed county map.
//!
//! Nodes are identified by county name. Edges are undirected and carry a
//! relation tag plus a mutable weight; lower weight means easier spread.
//! Policies may only change weights through [`CountyGraph::set_edge_weight`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::county::County;
use crate::error::{SimResult, SimulationError};
use crate::neighbors::NeighborIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Adjacent,
    Interstate,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Adjacent => f.write_str("adjacent"),
            Relation::Interstate => f.write_str("interstate"),
        }
    }
}

impl FromStr for Relation {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adjacent" => Ok(Relation::Adjacent),
            "interstate" => Ok(Relation::Interstate),
            other => Err(SimulationError::InvalidArgument(format!(
                "unknown edge relation '{other}'"
            ))),
        }
    }
}

/// One undirected edge. `base_weight` remembers the construction-time
/// weight so policies can relax back to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corridor {
    pub a: String,
    pub b: String,
    pub relation: Relation,
    pub weight: f64,
    pub base_weight: f64,
}

impl Corridor {
    pub fn connects(&self, from: &str, to: &str) -> bool {
        (self.a == from && self.b == to) || (self.a == to && self.b == from)
    }
}

/// Undirected weighted graph over county names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphParts", into = "GraphParts")]
pub struct CountyGraph {
    nodes: Vec<String>,
    corridors: Vec<Corridor>,
    node_index: HashMap<String, usize>,
    /// node position -> (neighbor position, corridor position), in edge insertion order.
    adjacency: Vec<Vec<(usize, usize)>>,
}

#[derive(Serialize, Deserialize)]
struct GraphParts {
    nodes: Vec<String>,
    corridors: Vec<Corridor>,
}

impl From<GraphParts> for CountyGraph {
    fn from(parts: GraphParts) -> Self {
        let mut graph = CountyGraph::new();
        for name in parts.nodes {
            graph.add_node(&name);
        }
        for corridor in parts.corridors {
            let (Some(a), Some(b)) = (graph.position(&corridor.a), graph.position(&corridor.b)) else {
                warn!(a = %corridor.a, b = %corridor.b, "corridor names an unknown county, skipping");
                continue;
            };
            if a == b {
                warn!(county = %corridor.a, "self-loop corridor, skipping");
                continue;
            }
            if graph.corridor_position(a, b).is_some() {
                warn!(a = %corridor.a, b = %corridor.b, "duplicate corridor, keeping the first");
                continue;
            }
            graph.insert_corridor(a, b, corridor);
        }
        graph
    }
}

impl From<CountyGraph> for GraphParts {
    fn from(graph: CountyGraph) -> Self {
        GraphParts {
            nodes: graph.nodes,
            corridors: graph.corridors,
        }
    }
}

impl CountyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; adding an existing name is a no-op.
    pub fn add_node(&mut self, name: &str) {
        if self.node_index.contains_key(name) {
            return;
        }
        self.node_index.insert(name.to_string(), self.nodes.len());
        self.nodes.push(name.to_string());
        self.adjacency.push(Vec::new());
    }

    /// Connect two existing nodes. Re-adding an edge overwrites its relation and weight.
    pub fn add_edge(&mut self, a: &str, b: &str, relation: Relation, weight: f64) -> SimResult<()> {
        let pa = self
            .position(a)
            .ok_or_else(|| SimulationError::MissingNode(a.to_string()))?;
        let pb = self
            .position(b)
            .ok_or_else(|| SimulationError::MissingNode(b.to_string()))?;
        if pa == pb {
            return Err(SimulationError::InvalidArgument(format!(
                "self-loop on '{a}' is not allowed"
            )));
        }
        if let Some(corridor) = self.corridor_position(pa, pb) {
            let existing = &mut self.corridors[corridor];
            existing.relation = relation;
            existing.weight = weight;
            existing.base_weight = weight;
            return Ok(());
        }
        let corridor = Corridor {
            a: a.to_string(),
            b: b.to_string(),
            relation,
            weight,
            base_weight: weight,
        };
        self.insert_corridor(pa, pb, corridor);
        Ok(())
    }

    fn insert_corridor(&mut self, pa: usize, pb: usize, corridor: Corridor) {
        let position = self.corridors.len();
        self.corridors.push(corridor);
        self.adjacency[pa].push((pb, position));
        self.adjacency[pb].push((pa, position));
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.node_index.get(name).copied()
    }

    fn corridor_position(&self, pa: usize, pb: usize) -> Option<usize> {
        self.adjacency[pa]
            .iter()
            .find(|(neighbor, _)| *neighbor == pb)
            .map(|(_, corridor)| *corridor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.corridors.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn corridors(&self) -> &[Corridor] {
        &self.corridors
    }

    /// Neighbor names of `name`, in edge insertion order.
    pub fn neighbors(&self, name: &str) -> SimResult<Vec<&str>> {
        let position = self
            .position(name)
            .ok_or_else(|| SimulationError::MissingNode(name.to_string()))?;
        Ok(self.adjacency[position]
            .iter()
            .map(|(neighbor, _)| self.nodes[*neighbor].as_str())
            .collect())
    }

    pub fn corridor(&self, a: &str, b: &str) -> SimResult<&Corridor> {
        let position = self.lookup(a, b)?;
        Ok(&self.corridors[position])
    }

    pub fn edge_weight(&self, a: &str, b: &str) -> SimResult<f64> {
        Ok(self.corridor(a, b)?.weight)
    }

    /// The single write path for edge weights; returns the previous weight.
    pub fn set_edge_weight(&mut self, a: &str, b: &str, weight: f64) -> SimResult<f64> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(SimulationError::InvalidArgument(format!(
                "edge weight must be positive and finite, got {weight}"
            )));
        }
        let position = self.lookup(a, b)?;
        let previous = self.corridors[position].weight;
        self.corridors[position].weight = weight;
        Ok(previous)
    }

    fn lookup(&self, a: &str, b: &str) -> SimResult<usize> {
        let pa = self
            .position(a)
            .ok_or_else(|| SimulationError::MissingNode(a.to_string()))?;
        let pb = self
            .position(b)
            .ok_or_else(|| SimulationError::MissingNode(b.to_string()))?;
        self.corridor_position(pa, pb)
            .ok_or_else(|| SimulationError::MissingEdge {
                from: a.to_string(),
                to: b.to_string(),
            })
    }
}

/// Counties keyed by name, iterated in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<County>", into = "Vec<County>")]
pub struct CountyMap {
    counties: Vec<County>,
    index: HashMap<String, usize>,
}

impl From<Vec<County>> for CountyMap {
    fn from(counties: Vec<County>) -> Self {
        let mut map = CountyMap::default();
        for county in counties {
            map.insert(county);
        }
        map
    }
}

impl From<CountyMap> for Vec<County> {
    fn from(map: CountyMap) -> Self {
        map.counties
    }
}

impl CountyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a county; replacement keeps the original position.
    /// Levels are clamped on the way in, including counties read from disk.
    pub fn insert(&mut self, mut county: County) {
        county.stabilize();
        match self.index.get(&county.name) {
            Some(&position) => self.counties[position] = county,
            None => {
                self.index.insert(county.name.clone(), self.counties.len());
                self.counties.push(county);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&County> {
        self.position(name).map(|position| &self.counties[position])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut County> {
        let position = self.position(name)?;
        Some(&mut self.counties[position])
    }

    pub fn at(&self, position: usize) -> Option<&County> {
        self.counties.get(position)
    }

    pub fn at_mut(&mut self, position: usize) -> Option<&mut County> {
        self.counties.get_mut(position)
    }

    /// Two distinct counties borrowed mutably at once.
    pub fn pair_mut(&mut self, first: usize, second: usize) -> Option<(&mut County, &mut County)> {
        if first == second || first >= self.counties.len() || second >= self.counties.len() {
            return None;
        }
        if first < second {
            let (head, tail) = self.counties.split_at_mut(second);
            Some((&mut head[first], &mut tail[0]))
        } else {
            let (head, tail) = self.counties.split_at_mut(first);
            Some((&mut tail[0], &mut head[second]))
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.counties.iter().map(|county| county.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &County> {
        self.counties.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut County> {
        self.counties.iter_mut()
    }

    pub fn saturations(&self) -> Vec<f64> {
        self.counties.iter().map(|county| county.saturation).collect()
    }
}

/// The three structures a simulation run consumes: the graph, the county
/// map, and the neighbor index derived from both.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub graph: CountyGraph,
    pub counties: CountyMap,
    pub neighbors: NeighborIndex,
}

impl Network {
    pub fn new(graph: CountyGraph, counties: CountyMap) -> Self {
        let neighbors = NeighborIndex::build(&graph, &counties);
        Self {
            graph,
            counties,
            neighbors,
        }
    }

    /// Rebuild the neighbor index after the county map was replaced.
    pub fn refresh_neighbors(&mut self) {
        self.neighbors = NeighborIndex::build(&self.graph, &self.counties);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> CountyGraph {
        let mut graph = CountyGraph::new();
        for name in ["Cook", "DuPage", "Will"] {
            graph.add_node(name);
        }
        graph.add_edge("Cook", "DuPage", Relation::Adjacent, 1.0).unwrap();
        graph.add_edge("Cook", "Will", Relation::Interstate, 0.5).unwrap();
        graph.add_edge("DuPage", "Will", Relation::Adjacent, 1.0).unwrap();
        graph
    }

    #[test]
    fn edges_are_undirected() {
        let graph = triangle();
        assert_eq!(graph.edge_weight("DuPage", "Cook").unwrap(), 1.0);
        assert_eq!(graph.corridor("Will", "Cook").unwrap().relation, Relation::Interstate);
        assert_eq!(graph.neighbors("Cook").unwrap(), vec!["DuPage", "Will"]);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn set_edge_weight_keeps_base() {
        let mut graph = triangle();
        let previous = graph.set_edge_weight("Will", "Cook", 3.0).unwrap();
        assert_eq!(previous, 0.5);
        let corridor = graph.corridor("Cook", "Will").unwrap();
        assert_eq!(corridor.weight, 3.0);
        assert_eq!(corridor.base_weight, 0.5);
    }

    #[test]
    fn rejects_bad_weights_and_unknown_nodes() {
        let mut graph = triangle();
        assert!(matches!(
            graph.set_edge_weight("Cook", "Will", 0.0),
            Err(SimulationError::InvalidArgument(_))
        ));
        assert!(matches!(
            graph.add_edge("Cook", "Pope", Relation::Adjacent, 1.0),
            Err(SimulationError::MissingNode(name)) if name == "Pope"
        ));
        graph.add_node("Pope");
        assert!(matches!(
            graph.edge_weight("Cook", "Pope"),
            Err(SimulationError::MissingEdge { .. })
        ));
    }

    #[test]
    fn graph_round_trips_through_json() {
        let mut graph = triangle();
        graph.set_edge_weight("Cook", "DuPage", 4.0).unwrap();
        let json = serde_json::to_string(&graph).unwrap();
        let restored: CountyGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.edge_weight("DuPage", "Cook").unwrap(), 4.0);
        assert_eq!(restored.corridor("Cook", "DuPage").unwrap().base_weight, 1.0);
        assert_eq!(restored.neighbors("Will").unwrap(), vec!["Cook", "DuPage"]);
    }

    #[test]
    fn loaded_graph_drops_duplicate_and_dangling_corridors() {
        let json = r#"{
            "nodes": ["A", "B"],
            "corridors": [
                {"a": "A", "b": "B", "relation": "adjacent", "weight": 2.0, "base_weight": 1.0},
                {"a": "B", "b": "A", "relation": "interstate", "weight": 9.0, "base_weight": 9.0},
                {"a": "A", "b": "Ghost", "relation": "adjacent", "weight": 1.0, "base_weight": 1.0},
                {"a": "B", "b": "B", "relation": "adjacent", "weight": 1.0, "base_weight": 1.0}
            ]
        }"#;
        let graph: CountyGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors("A").unwrap(), vec!["B"]);
        assert_eq!(graph.neighbors("B").unwrap(), vec!["A"]);
        let corridor = graph.corridor("B", "A").unwrap();
        assert_eq!(corridor.relation, Relation::Adjacent);
        assert_eq!((corridor.weight, corridor.base_weight), (2.0, 1.0));
        assert!(!graph.contains("Ghost"));
    }

    #[test]
    fn loaded_counties_are_clamped() {
        let mut counties = serde_json::to_value(vec![County::new("A"), County::new("B")]).unwrap();
        counties[0]["saturation"] = serde_json::json!(1.7);
        counties[1]["egg_population"] = serde_json::json!(-0.4);
        let map: CountyMap = serde_json::from_value(counties).unwrap();
        assert_eq!(map.get("A").unwrap().saturation, 1.0);
        assert_eq!(map.get("B").unwrap().egg_population, 0.0);
        assert!(map.saturations().iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn county_map_preserves_insertion_order() {
        let mut map = CountyMap::new();
        map.insert(County::new("Pope"));
        map.insert(County::new("Cook"));
        map.insert(County::new("Pope").with_saturation(0.3));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["Pope", "Cook"]);
        assert_eq!(map.get("Pope").unwrap().saturation, 0.3);
    }

    #[test]
    fn pair_mut_borrows_both_orders() {
        let mut map = CountyMap::new();
        map.insert(County::new("A"));
        map.insert(County::new("B"));
        {
            let (b, a) = map.pair_mut(1, 0).unwrap();
            assert_eq!(b.name, "B");
            a.saturation = 0.4;
        }
        assert_eq!(map.get("A").unwrap().saturation, 0.4);
        assert!(map.pair_mut(0, 0).is_none());
        assert!(map.pair_mut(0, 5).is_none());
    }
}
