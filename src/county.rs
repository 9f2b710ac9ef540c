//! Per-county ecological state and its life-cycle transitions.
//!
//! Every mutating method ends with [`County::stabilize`], so the bounded
//! quantities (saturation, mated proportion, egg population, host density)
//! never leave `[0, 1]` between calls.

use std::hash::{Hash, Hasher};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rng::{unit_clamp, Draw};

/// Mating chance used when the caller does not supply one.
pub const DEFAULT_MATING_CHANCE: Draw = Draw::normal(0.6, 0.2);
/// Share of the egg population that hatches when the caller does not supply one.
pub const DEFAULT_HATCH_CHANCE: Draw = Draw::uniform(0.75, 1.0);
/// Winter mortality used when the caller does not supply one.
pub const DEFAULT_MORTALITY: Draw = Draw::uniform(0.75, 1.0);
/// Saturation gained per hatched hundredth of the egg population.
pub const HATCH_INCREMENT: Draw = Draw::uniform(0.035, 0.045);

const HATCH_UNIT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    /// Longitude.
    pub x: f64,
    /// Latitude.
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct County {
    pub name: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub centroid: Option<Centroid>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub pop_density: Option<f64>,
    #[serde(default)]
    pub saturation: f64,
    #[serde(default)]
    pub mated: f64,
    #[serde(default)]
    pub laid_eggs: f64,
    #[serde(default)]
    pub egg_population: f64,
    #[serde(default)]
    pub toh_density: f64,
    #[serde(default)]
    pub tree_density: f64,
    #[serde(default = "default_traffic_level")]
    pub traffic_level: f64,
    #[serde(default)]
    pub quarantine: bool,
    #[serde(default)]
    pub public_awareness: bool,
}

fn default_traffic_level() -> f64 {
    1.0
}

impl County {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lat: None,
            lon: None,
            centroid: None,
            population: None,
            pop_density: None,
            saturation: 0.0,
            mated: 0.0,
            laid_eggs: 0.0,
            egg_population: 0.0,
            toh_density: 0.0,
            tree_density: 0.0,
            traffic_level: default_traffic_level(),
            quarantine: false,
            public_awareness: false,
        }
    }

    pub fn with_saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self.stabilize();
        self
    }

    pub fn with_densities(mut self, toh_density: f64, tree_density: f64) -> Self {
        self.toh_density = toh_density;
        self.tree_density = tree_density;
        self.stabilize();
        self
    }

    pub fn with_population(mut self, population: u64, pop_density: f64) -> Self {
        self.population = Some(population);
        self.pop_density = Some(pop_density);
        self
    }

    pub fn with_centroid(mut self, lon: f64, lat: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self.centroid = Some(Centroid { x: lon, y: lat });
        self
    }

    /// Total vegetation a newly arriving population has to compete across.
    pub fn total_density(&self) -> f64 {
        self.toh_density + self.tree_density
    }

    /// Clamp every bounded quantity back into `[0, 1]`.
    pub fn stabilize(&mut self) {
        self.saturation = unit_clamp(self.saturation);
        self.mated = unit_clamp(self.mated);
        self.laid_eggs = unit_clamp(self.laid_eggs);
        self.egg_population = unit_clamp(self.egg_population);
        self.toh_density = unit_clamp(self.toh_density);
    }

    /// Grow the mated proportion by `saturation * chance * (1 - mated)`.
    pub fn mate<R: Rng + ?Sized>(&mut self, chance: Option<f64>, rng: &mut R) -> f64 {
        let chance = unit_clamp(chance.unwrap_or_else(|| DEFAULT_MATING_CHANCE.sample(rng)));
        let newly_mated = self.saturation * chance * (1.0 - self.mated);
        self.mated += newly_mated;
        self.stabilize();
        self.mated
    }

    /// Lay egg masses in proportion to the mated share and the available trees.
    ///
    /// `extra_chance` adds that fraction of the new masses on top, modelling
    /// females that manage a second mass.
    pub fn lay_eggs(&mut self, scaling: f64, extra_chance: f64) -> f64 {
        let new_egg_masses = self.mated * self.total_density() * scaling.max(0.0);
        let additional = new_egg_masses * extra_chance.max(0.0);
        self.egg_population += new_egg_masses + additional;
        self.laid_eggs = self.mated;
        self.stabilize();
        self.egg_population
    }

    /// Hatch a chance-weighted share of the egg population into saturation.
    ///
    /// The hatch budget is consumed one hundredth at a time, each unit adding
    /// a small sampled increment to saturation.
    pub fn hatch_eggs<R: Rng + ?Sized>(&mut self, chance: Option<f64>, rng: &mut R) -> f64 {
        let chance = unit_clamp(chance.unwrap_or_else(|| DEFAULT_HATCH_CHANCE.sample(rng)));
        let units = (self.egg_population * chance / HATCH_UNIT).round() as u32;
        for _ in 0..units {
            self.saturation += HATCH_INCREMENT.sample(rng);
            self.egg_population -= HATCH_UNIT;
        }
        self.stabilize();
        self.saturation
    }

    /// Kill off a share of the population and reset the breeding trackers.
    pub fn die_off<R: Rng + ?Sized>(&mut self, mortality_rate: Option<f64>, rng: &mut R) -> f64 {
        let rate = unit_clamp(mortality_rate.unwrap_or_else(|| DEFAULT_MORTALITY.sample(rng)));
        self.saturation -= self.saturation * rate;
        self.mated = 0.0;
        self.laid_eggs = 0.0;
        self.stabilize();
        self.saturation
    }

    /// Destroy a share of the egg population (egg-mass scraping).
    pub fn destroy_eggs(&mut self, fraction: f64) -> f64 {
        self.egg_population -= self.egg_population * unit_clamp(fraction);
        self.stabilize();
        self.egg_population
    }

    /// Add saturation arriving from elsewhere.
    pub fn receive(&mut self, saturation: f64, eggs: f64) {
        self.saturation += saturation.max(0.0);
        self.egg_population += eggs.max(0.0);
        self.stabilize();
    }
}

impl PartialEq for County {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for County {}

impl Hash for County {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
