//! Tuning parameters for spread, life cycle and countermeasures.
//!
//! Threshold constants and stochastic bands are still being calibrated, so
//! every one of them is a field with a serde default rather than a literal
//! in the model code.

use serde::{Deserialize, Serialize};

use crate::county::DEFAULT_MATING_CHANCE;
use crate::months::Month;
use crate::rng::Draw;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    #[serde(default)]
    pub spread: SpreadConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadConfig {
    /// Coefficient in the numerator of the spread probability.
    #[serde(default = "default_spread_coefficient")]
    pub coefficient: Draw,
    /// Share of `saturation * probability` that actually moves.
    #[serde(default = "default_variability")]
    pub variability: Draw,
    /// Eggs carried along per unit of transferred saturation, inside the egg window.
    #[serde(default = "default_egg_transfer_ratio")]
    pub egg_transfer_ratio: f64,
    /// Months in which hitch-hiking egg masses travel with the insects.
    #[serde(default = "default_egg_window")]
    pub egg_window: Vec<Month>,
    /// Per-step saturation growth applied when the life cycle is disabled.
    #[serde(default = "default_growth")]
    pub growth: Draw,
}

fn default_spread_coefficient() -> Draw {
    Draw::normal(0.5, 0.2)
}

fn default_variability() -> Draw {
    Draw::uniform(0.05, 0.15)
}

fn default_egg_transfer_ratio() -> f64 {
    0.5
}

fn default_egg_window() -> Vec<Month> {
    vec![Month::September, Month::October, Month::November]
}

fn default_growth() -> Draw {
    Draw::normal(0.025, 0.01)
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            coefficient: default_spread_coefficient(),
            variability: default_variability(),
            egg_transfer_ratio: default_egg_transfer_ratio(),
            egg_window: default_egg_window(),
            growth: default_growth(),
        }
    }
}

impl SpreadConfig {
    /// A configuration with every draw pinned, for reproducible calibration.
    pub fn fixed(coefficient: f64, variability: f64) -> Self {
        Self {
            coefficient: Draw::fixed(coefficient),
            variability: Draw::fixed(variability),
            growth: Draw::fixed(0.0),
            ..Self::default()
        }
    }

    pub fn in_egg_window(&self, month: Month) -> bool {
        self.egg_window.contains(&month)
    }
}

/// Where the seasonal life cycle runs relative to spread within a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    #[default]
    BeforeSpread,
    AfterSpread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub phase: LifecyclePhase,
    #[serde(default = "default_hatch_months")]
    pub hatch_months: Vec<Month>,
    #[serde(default = "default_mating_months")]
    pub mating_months: Vec<Month>,
    #[serde(default = "default_laying_months")]
    pub laying_months: Vec<Month>,
    #[serde(default = "default_die_off_months")]
    pub die_off_months: Vec<Month>,
    #[serde(default = "default_mating_chance")]
    pub mating_chance: Draw,
    #[serde(default = "default_hatch_chance")]
    pub hatch_chance: Draw,
    #[serde(default = "default_winter_mortality")]
    pub winter_mortality: Draw,
    #[serde(default = "default_egg_scaling")]
    pub egg_scaling: f64,
    #[serde(default = "default_extra_egg_chance")]
    pub extra_egg_chance: Draw,
}

fn default_hatch_months() -> Vec<Month> {
    vec![Month::May, Month::June]
}

fn default_mating_months() -> Vec<Month> {
    vec![Month::July, Month::August, Month::September]
}

fn default_laying_months() -> Vec<Month> {
    vec![Month::September, Month::October, Month::November]
}

fn default_die_off_months() -> Vec<Month> {
    vec![Month::December]
}

fn default_mating_chance() -> Draw {
    DEFAULT_MATING_CHANCE
}

fn default_hatch_chance() -> Draw {
    Draw::uniform(0.75, 1.0)
}

fn default_winter_mortality() -> Draw {
    Draw::uniform(0.75, 1.0)
}

fn default_egg_scaling() -> f64 {
    0.5
}

fn default_extra_egg_chance() -> Draw {
    Draw::uniform(0.0, 0.12)
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            phase: LifecyclePhase::default(),
            hatch_months: default_hatch_months(),
            mating_months: default_mating_months(),
            laying_months: default_laying_months(),
            die_off_months: default_die_off_months(),
            mating_chance: default_mating_chance(),
            hatch_chance: default_hatch_chance(),
            winter_mortality: default_winter_mortality(),
            egg_scaling: default_egg_scaling(),
            extra_egg_chance: default_extra_egg_chance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Saturation at which a county becomes publicly aware.
    #[serde(default = "default_awareness_high")]
    pub awareness_high: f64,
    /// Saturation below which awareness lapses.
    #[serde(default = "default_awareness_low")]
    pub awareness_low: f64,
    /// Awareness spreads to a neighbor whose saturation is at least this share of the source's.
    #[serde(default = "default_awareness_ratio")]
    pub awareness_ratio: f64,
    /// Saturation at which quarantine is declared.
    #[serde(default = "default_quarantine_high")]
    pub quarantine_high: f64,
    /// Saturation below which quarantine is lifted.
    #[serde(default = "default_quarantine_low")]
    pub quarantine_low: f64,
    /// Weight multiplier for adjacent edges touching a quarantined county.
    #[serde(default = "default_adjacent_friction")]
    pub adjacent_friction: f64,
    /// Weight multiplier for interstate edges touching a quarantined county.
    #[serde(default = "default_interstate_friction")]
    pub interstate_friction: f64,
    /// Divides host density to give the poisoning die-off rate.
    #[serde(default = "default_poison_damping")]
    pub poison_damping: Draw,
    /// Share of host density removed by each poisoning.
    #[serde(default = "default_toh_reduction")]
    pub toh_reduction: f64,
    /// Per-person removal effort of an aware population.
    #[serde(default = "default_squash_rate")]
    pub squash_rate: Draw,
    /// Population density at which squashing reaches half effect.
    #[serde(default = "default_density_half_effect")]
    pub density_half_effect: f64,
    /// Egg masses scraped per unit of squash effect.
    #[serde(default = "default_egg_scrape_ratio")]
    pub egg_scrape_ratio: f64,
}

fn default_awareness_high() -> f64 {
    0.5
}

fn default_awareness_low() -> f64 {
    0.2
}

fn default_awareness_ratio() -> f64 {
    0.75
}

fn default_quarantine_high() -> f64 {
    0.75
}

fn default_quarantine_low() -> f64 {
    0.25
}

fn default_adjacent_friction() -> f64 {
    4.0
}

fn default_interstate_friction() -> f64 {
    2.0
}

fn default_poison_damping() -> Draw {
    Draw::uniform(2.0, 4.0)
}

fn default_toh_reduction() -> f64 {
    0.02
}

fn default_squash_rate() -> Draw {
    Draw::normal(0.3, 0.1)
}

fn default_density_half_effect() -> f64 {
    1_000.0
}

fn default_egg_scrape_ratio() -> f64 {
    0.5
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            awareness_high: default_awareness_high(),
            awareness_low: default_awareness_low(),
            awareness_ratio: default_awareness_ratio(),
            quarantine_high: default_quarantine_high(),
            quarantine_low: default_quarantine_low(),
            adjacent_friction: default_adjacent_friction(),
            interstate_friction: default_interstate_friction(),
            poison_damping: default_poison_damping(),
            toh_reduction: default_toh_reduction(),
            squash_rate: default_squash_rate(),
            density_half_effect: default_density_half_effect(),
            egg_scrape_ratio: default_egg_scrape_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let tuning: Tuning = serde_yaml::from_str("{}").unwrap();
        assert_eq!(tuning, Tuning::default());
        assert_eq!(tuning.policy.quarantine_high, 0.75);
        assert!(tuning.spread.in_egg_window(Month::October));
        assert!(!tuning.spread.in_egg_window(Month::March));
    }

    #[test]
    fn default_mating_chance_covers_the_seasonal_band() {
        let tuning = Tuning::default();
        let Draw::Normal { mean, std_dev } = tuning.lifecycle.mating_chance else {
            panic!("mating chance should default to a normal draw");
        };
        assert_eq!(mean, 0.6);
        assert!(std_dev >= 0.2);
        // two standard deviations reach from about 0.2 to 1.0
        assert!(mean - 2.0 * std_dev <= 0.2 + 1e-12);
        assert!(mean + 2.0 * std_dev >= 1.0 - 1e-12);
    }

    #[test]
    fn partial_yaml_overrides_single_fields() {
        let yaml = "policy:\n  awareness_high: 0.6\nlifecycle:\n  phase: after_spread\n";
        let tuning: Tuning = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tuning.policy.awareness_high, 0.6);
        assert_eq!(tuning.policy.awareness_low, 0.2);
        assert_eq!(tuning.lifecycle.phase, LifecyclePhase::AfterSpread);
    }

    #[test]
    fn fixed_spread_pins_every_draw() {
        let spread = SpreadConfig::fixed(1.0, 0.1);
        assert_eq!(spread.coefficient, Draw::fixed(1.0));
        assert_eq!(spread.variability, Draw::fixed(0.1));
        assert_eq!(spread.growth, Draw::fixed(0.0));
    }
}
