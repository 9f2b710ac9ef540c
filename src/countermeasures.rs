//! Intervention policies applied to each (county, neighbor) pair.
//!
//! Policies only touch state through [`County`] methods and
//! [`CountyGraph::set_edge_weight`], so the clamp-after-mutate invariant
//! and the single edge-writer path both hold.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PolicyConfig;
use crate::county::County;
use crate::error::{SimResult, SimulationError};
use crate::network::{CountyGraph, Relation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RunMode {
    Baseline,
    PoisonToh,
    PopulationBased,
    Quarantine,
    All,
}

impl RunMode {
    pub const ALL_MODES: [RunMode; 5] = [
        RunMode::Baseline,
        RunMode::PoisonToh,
        RunMode::PopulationBased,
        RunMode::Quarantine,
        RunMode::All,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RunMode::Baseline => "Baseline",
            RunMode::PoisonToh => "Poison ToH",
            RunMode::PopulationBased => "Population-Based",
            RunMode::Quarantine => "Quarantine",
            RunMode::All => "All",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RunMode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .to_ascii_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "baseline" => Ok(RunMode::Baseline),
            "poison toh" | "poison" => Ok(RunMode::PoisonToh),
            "population based" | "population based countermeasures" => {
                Ok(RunMode::PopulationBased)
            }
            "quarantine" => Ok(RunMode::Quarantine),
            "all" => Ok(RunMode::All),
            _ => Err(SimulationError::InvalidRunMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for RunMode {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RunMode> for String {
    fn from(mode: RunMode) -> Self {
        mode.label().to_string()
    }
}

pub struct Countermeasures<'a> {
    config: &'a PolicyConfig,
}

impl<'a> Countermeasures<'a> {
    pub fn new(config: &'a PolicyConfig) -> Self {
        Self { config }
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        mode: RunMode,
        graph: &mut CountyGraph,
        source: &mut County,
        neighbor: &mut County,
        rng: &mut R,
    ) -> SimResult<()> {
        match mode {
            RunMode::Baseline => {}
            RunMode::PoisonToh => self.poison_host_plants(neighbor, rng),
            RunMode::PopulationBased => self.population_response(source, neighbor, rng),
            RunMode::Quarantine => self.quarantine(graph, source, neighbor, rng)?,
            RunMode::All => {
                self.poison_host_plants(neighbor, rng);
                self.quarantine(graph, source, neighbor, rng)?;
                self.population_response(source, neighbor, rng);
            }
        }
        Ok(())
    }

    /// Toggle awareness on the high/low saturation thresholds.
    pub fn update_awareness(&self, county: &mut County) -> bool {
        let was = county.public_awareness;
        if county.saturation >= self.config.awareness_high {
            county.public_awareness = true;
        } else if county.saturation < self.config.awareness_low {
            county.public_awareness = false;
        }
        if was != county.public_awareness {
            debug!(county = %county.name, aware = county.public_awareness, "awareness changed");
        }
        was != county.public_awareness
    }

    /// Toggle quarantine on the high/low saturation thresholds.
    pub fn update_quarantine(&self, county: &mut County) -> bool {
        let was = county.quarantine;
        if county.saturation >= self.config.quarantine_high {
            county.quarantine = true;
        } else if county.saturation < self.config.quarantine_low {
            county.quarantine = false;
        }
        if was != county.quarantine {
            debug!(county = %county.name, quarantine = county.quarantine, "quarantine changed");
        }
        was != county.quarantine
    }

    /// Poison tree-of-heaven in an aware county: a die-off scaled by host
    /// density, and a little less host density afterwards.
    pub fn poison_host_plants<R: Rng + ?Sized>(&self, county: &mut County, rng: &mut R) {
        self.update_awareness(county);
        if !county.public_awareness {
            return;
        }
        let damping = self.config.poison_damping.sample(rng).max(1.0);
        county.die_off(Some(county.toh_density / damping), rng);
        county.toh_density *= 1.0 - self.config.toh_reduction.clamp(0.0, 1.0);
        county.stabilize();
    }

    /// Awareness driven by the public: it propagates to comparably infested
    /// neighbors, and aware neighbors squash adults and scrape egg masses.
    pub fn population_response<R: Rng + ?Sized>(
        &self,
        source: &mut County,
        neighbor: &mut County,
        rng: &mut R,
    ) {
        self.update_awareness(source);
        if source.public_awareness
            && !neighbor.public_awareness
            && neighbor.saturation >= source.saturation * self.config.awareness_ratio
        {
            neighbor.public_awareness = true;
            debug!(from = %source.name, to = %neighbor.name, "awareness propagated");
        }
        if neighbor.public_awareness {
            self.squash(neighbor, rng);
        }
    }

    /// Die-off and egg removal proportional to population density.
    pub fn squash<R: Rng + ?Sized>(&self, county: &mut County, rng: &mut R) -> f64 {
        let density = county.pop_density.unwrap_or(0.0).max(0.0);
        let half = self.config.density_half_effect.max(f64::EPSILON);
        let effect = self.config.squash_rate.sample_unit(rng) * density / (density + half);
        county.die_off(Some(effect), rng);
        county.destroy_eggs(effect * self.config.egg_scrape_ratio);
        effect
    }

    /// Quarantine raises friction on every edge touching a quarantined county
    /// and forces the neighbor's awareness. Edges between two free counties
    /// relax back to their construction weight, and the neighbor's awareness
    /// falls back to the saturation thresholds.
    pub fn quarantine<R: Rng + ?Sized>(
        &self,
        graph: &mut CountyGraph,
        source: &mut County,
        neighbor: &mut County,
        rng: &mut R,
    ) -> SimResult<()> {
        self.update_quarantine(source);
        self.update_quarantine(neighbor);

        let corridor = graph.corridor(&source.name, &neighbor.name)?;
        let (relation, weight, base) = (corridor.relation, corridor.weight, corridor.base_weight);

        let target = if source.quarantine || neighbor.quarantine {
            neighbor.public_awareness = true;
            let friction = match relation {
                Relation::Adjacent => self.config.adjacent_friction,
                Relation::Interstate => self.config.interstate_friction,
            };
            base * friction
        } else {
            self.update_awareness(neighbor);
            base
        };
        if weight != target {
            graph.set_edge_weight(&source.name, &neighbor.name, target)?;
            debug!(from = %source.name, to = %neighbor.name, weight = target, "edge weight rewritten");
        }

        if neighbor.public_awareness {
            self.squash(neighbor, rng);
        }
        Ok(())
    }
}
