//! Tolerant construction of a [`Network`] from in-memory records.
//!
//! Records that reference unknown counties are skipped with a warning
//! instead of failing the whole build.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::county::County;
use crate::network::{CountyGraph, CountyMap, Network, Relation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyRecord {
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub pop_density: Option<f64>,
    /// Explicit host-plant density; sightings override it when supplied.
    #[serde(default)]
    pub toh_density: Option<f64>,
    /// Explicit general tree density; banding overrides it when configured.
    #[serde(default)]
    pub tree_density: Option<f64>,
}

impl CountyRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lat: None,
            lon: None,
            population: None,
            pop_density: None,
            toh_density: None,
            tree_density: None,
        }
    }

    pub fn at(mut self, lon: f64, lat: f64) -> Self {
        self.lon = Some(lon);
        self.lat = Some(lat);
        self
    }

    fn into_county(self) -> County {
        let mut county = County::new(self.name);
        if let (Some(lon), Some(lat)) = (self.lon, self.lat) {
            county = county.with_centroid(lon, lat);
        }
        county.population = self.population;
        county.pop_density = self.pop_density;
        county.with_densities(
            self.toh_density.unwrap_or_default(),
            self.tree_density.unwrap_or_default(),
        )
    }
}

fn default_relation() -> Relation {
    Relation::Adjacent
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    #[serde(default = "default_relation")]
    pub relation: Relation,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, relation: Relation, weight: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            weight,
        }
    }
}

/// One host-plant observation attributed to a county.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub county: String,
    pub infest_index: f64,
}

/// General tree density assigned by latitude band, using three reference
/// counties: everything south of `southern`, or south-west of `western`,
/// is forested; everything else south of `central` is moderate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeBanding {
    pub southern: String,
    pub western: String,
    pub central: String,
    #[serde(default = "default_south_density")]
    pub south_density: f64,
    #[serde(default = "default_central_density")]
    pub central_density: f64,
    #[serde(default = "default_north_density")]
    pub north_density: f64,
}

fn default_south_density() -> f64 {
    0.6
}

fn default_central_density() -> f64 {
    0.4
}

fn default_north_density() -> f64 {
    0.2
}

impl TreeBanding {
    pub fn new(southern: impl Into<String>, western: impl Into<String>, central: impl Into<String>) -> Self {
        Self {
            southern: southern.into(),
            western: western.into(),
            central: central.into(),
            south_density: default_south_density(),
            central_density: default_central_density(),
            north_density: default_north_density(),
        }
    }

    /// Assign tree densities in place. Leaves the map untouched if a
    /// reference county is missing or has no centroid.
    pub fn apply(&self, counties: &mut CountyMap) {
        let reference = |name: &str| counties.get(name).and_then(|county| county.centroid);
        let (Some(southern), Some(western), Some(central)) = (
            reference(&self.southern),
            reference(&self.western),
            reference(&self.central),
        ) else {
            warn!(
                southern = %self.southern,
                western = %self.western,
                central = %self.central,
                "tree banding reference county missing or without centroid, skipping"
            );
            return;
        };

        for county in counties.iter_mut() {
            let Some(point) = county.centroid else {
                warn!(county = %county.name, "no centroid, tree density left unchanged");
                continue;
            };
            county.tree_density = if point.y <= southern.y || (point.y <= western.y && point.x <= western.x) {
                self.south_density
            } else if point.y <= central.y {
                self.central_density
            } else {
                self.north_density
            };
        }
    }
}

/// Relative host-plant density per county from sighting records.
///
/// Each county's mean index is clamped into the observed range and divided
/// by the maximum, rounded to two decimals. Counties without sightings map
/// to zero. They are deliberately not clamped up to `min / max` like a
/// surveyed county would be, so an unsurveyed county carries no host plants.
pub fn host_density_from_sightings(sightings: &[Sighting], counties: &CountyMap) -> HashMap<String, f64> {
    let mut totals: HashMap<&str, (f64, u32)> = HashMap::new();
    let mut max_index = f64::MIN;
    let mut min_index = f64::MAX;
    for sighting in sightings {
        if !counties.contains(&sighting.county) {
            warn!(county = %sighting.county, "sighting for unknown county, skipping");
            continue;
        }
        if !sighting.infest_index.is_finite() {
            continue;
        }
        max_index = max_index.max(sighting.infest_index);
        min_index = min_index.min(sighting.infest_index);
        let entry = totals.entry(sighting.county.as_str()).or_insert((0.0, 0));
        entry.0 += sighting.infest_index;
        entry.1 += 1;
    }

    counties
        .names()
        .map(|name| {
            let density = match totals.get(name) {
                Some(&(total, count)) if count > 0 && max_index > 0.0 => {
                    let average = (total / f64::from(count)).clamp(min_index, max_index);
                    round2(average / max_index)
                }
                _ => 0.0,
            };
            (name.to_string(), density)
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default)]
pub struct NetworkBuilder {
    counties: Vec<CountyRecord>,
    edges: Vec<EdgeRecord>,
    sightings: Vec<Sighting>,
    banding: Option<TreeBanding>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counties(mut self, counties: impl IntoIterator<Item = CountyRecord>) -> Self {
        self.counties.extend(counties);
        self
    }

    pub fn with_edges(mut self, edges: impl IntoIterator<Item = EdgeRecord>) -> Self {
        self.edges.extend(edges);
        self
    }

    pub fn with_sightings(mut self, sightings: impl IntoIterator<Item = Sighting>) -> Self {
        self.sightings.extend(sightings);
        self
    }

    pub fn with_tree_banding(mut self, banding: Option<TreeBanding>) -> Self {
        self.banding = banding;
        self
    }

    pub fn build(self) -> Network {
        let mut graph = CountyGraph::new();
        let mut counties = CountyMap::new();
        for record in self.counties {
            graph.add_node(&record.name);
            counties.insert(record.into_county());
        }

        let mut skipped = 0usize;
        for edge in &self.edges {
            if !edge.weight.is_finite() || edge.weight <= 0.0 {
                warn!(source = %edge.source, target = %edge.target, weight = edge.weight, "non-positive edge weight, skipping");
                skipped += 1;
                continue;
            }
            if let Err(err) = graph.add_edge(&edge.source, &edge.target, edge.relation, edge.weight) {
                warn!(source = %edge.source, target = %edge.target, error = %err, "skipping edge");
                skipped += 1;
            }
        }

        if !self.sightings.is_empty() {
            let densities = host_density_from_sightings(&self.sightings, &counties);
            for county in counties.iter_mut() {
                if let Some(&density) = densities.get(&county.name) {
                    county.toh_density = density;
                    county.stabilize();
                }
            }
        }

        if let Some(banding) = &self.banding {
            banding.apply(&mut counties);
        }

        let network = Network::new(graph, counties);
        for name in network.neighbors.isolated() {
            warn!(county = name, "county has no neighbors");
        }
        debug!(
            counties = network.counties.len(),
            edges = network.graph.edge_count(),
            skipped,
            "network built"
        );
        network
    }
}
