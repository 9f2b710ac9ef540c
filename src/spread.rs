//! Stochastic transfer of saturation across graph edges.
//!
//! [`spread_transfer`] is the only channel through which saturation moves
//! between counties.

use rand::Rng;

use crate::config::SpreadConfig;
use crate::county::County;
use crate::error::SimResult;
use crate::months::Month;
use crate::network::CountyGraph;
use crate::rng::unit_clamp;

/// Floor for divisors, so bare counties and zero-weight edges saturate the
/// probability instead of producing infinities.
const MIN_DIVISOR: f64 = 1e-6;

/// Probability that `source` seeds `neighbor` this step, in `[0, 1]`.
pub fn spread_probability(
    graph: &CountyGraph,
    source: &County,
    neighbor: &County,
    coefficient: f64,
) -> SimResult<f64> {
    let weight = graph.edge_weight(&source.name, &neighbor.name)?;
    Ok(probability_over_edge(source, neighbor, weight, coefficient))
}

/// `(coefficient * saturation / neighbor density) / weight * traffic`, clamped.
pub fn probability_over_edge(source: &County, neighbor: &County, weight: f64, coefficient: f64) -> f64 {
    let dilution = neighbor.total_density().max(MIN_DIVISOR);
    let weight = weight.max(MIN_DIVISOR);
    let raw = (coefficient * source.saturation / dilution) / weight * source.traffic_level;
    unit_clamp(raw)
}

/// Move `saturation * probability * variability` into `neighbor`.
///
/// Inside the egg window a proportional amount of egg mass travels too.
/// Returns the saturation added before clamping.
pub fn spread_transfer(
    source: &County,
    neighbor: &mut County,
    probability: f64,
    variability: f64,
    month: Month,
    config: &SpreadConfig,
) -> f64 {
    let amount = (source.saturation * unit_clamp(probability) * variability.max(0.0)).max(0.0);
    let eggs = if config.in_egg_window(month) {
        amount * config.egg_transfer_ratio.max(0.0)
    } else {
        0.0
    };
    neighbor.receive(amount, eggs);
    amount
}

/// Samples the spread draws from a [`SpreadConfig`].
pub struct SpreadEngine<'a> {
    config: &'a SpreadConfig,
}

impl<'a> SpreadEngine<'a> {
    pub fn new(config: &'a SpreadConfig) -> Self {
        Self { config }
    }

    pub fn probability<R: Rng + ?Sized>(
        &self,
        graph: &CountyGraph,
        source: &County,
        neighbor: &County,
        rng: &mut R,
    ) -> SimResult<f64> {
        let coefficient = self.config.coefficient.sample(rng);
        spread_probability(graph, source, neighbor, coefficient)
    }

    pub fn transfer<R: Rng + ?Sized>(
        &self,
        source: &County,
        neighbor: &mut County,
        probability: f64,
        month: Month,
        rng: &mut R,
    ) -> f64 {
        let variability = self.config.variability.sample(rng);
        spread_transfer(source, neighbor, probability, variability, month, self.config)
    }

    /// Natural growth used when the life cycle is switched off.
    pub fn grow<R: Rng + ?Sized>(&self, county: &mut County, rng: &mut R) {
        let rate = self.config.growth.sample(rng);
        county.saturation += county.saturation * rate;
        county.stabilize();
    }
}
