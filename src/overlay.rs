use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::county::County;
use crate::error::SimulationError;
use crate::network::CountyMap;

/// Starting-state overrides for a single county. Unset fields keep the
/// value the network was built with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountyOverride {
    #[serde(default)]
    pub saturation: Option<f64>,
    #[serde(default)]
    pub egg_population: Option<f64>,
    #[serde(default)]
    pub mated: Option<f64>,
    #[serde(default)]
    pub toh_density: Option<f64>,
    #[serde(default)]
    pub tree_density: Option<f64>,
    #[serde(default)]
    pub pop_density: Option<f64>,
    #[serde(default)]
    pub quarantine: Option<bool>,
    #[serde(default)]
    pub public_awareness: Option<bool>,
}

impl CountyOverride {
    pub fn saturation(value: f64) -> Self {
        Self {
            saturation: Some(value),
            ..Self::default()
        }
    }

    fn apply_to(&self, county: &mut County) {
        if let Some(value) = self.saturation {
            county.saturation = value;
        }
        if let Some(value) = self.egg_population {
            county.egg_population = value;
        }
        if let Some(value) = self.mated {
            county.mated = value;
        }
        if let Some(value) = self.toh_density {
            county.toh_density = value;
        }
        if let Some(value) = self.tree_density {
            county.tree_density = value;
        }
        if let Some(value) = self.pop_density {
            county.pop_density = Some(value);
        }
        if let Some(value) = self.quarantine {
            county.quarantine = value;
        }
        if let Some(value) = self.public_awareness {
            county.public_awareness = value;
        }
        county.stabilize();
    }
}

/// Per-county coefficient overlay keyed by county name, applied once
/// before the first step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overlay {
    entries: BTreeMap<String, CountyOverride>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, values: CountyOverride) -> Self {
        self.entries.insert(name.into(), values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply every entry; names missing from the map are logged and skipped.
    /// Returns how many counties were touched.
    pub fn apply(&self, counties: &mut CountyMap) -> usize {
        let mut applied = 0;
        for (name, values) in &self.entries {
            match counties.get_mut(name) {
                Some(county) => {
                    values.apply_to(county);
                    applied += 1;
                }
                None => {
                    let err = SimulationError::MissingNode(name.clone());
                    warn!(error = %err, "skipping overlay entry");
                }
            }
        }
        applied
    }
}
