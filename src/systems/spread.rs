use rand::Rng;
use tracing::warn;

use crate::{
    countermeasures::{Countermeasures, RunMode},
    county::County,
    engine::{System, SystemContext},
    error::SimResult,
    months::Month,
    network::{CountyGraph, Network},
    rng::SystemRng,
    spread::SpreadEngine,
};

/// Per-pair spread with the active countermeasure policy.
///
/// Counties are visited in map order and neighbors in index order; a county
/// is mutated both as a source and as a neighbor within one step, so the
/// visiting order is part of the model.
pub struct SpreadSystem;

impl SpreadSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SpreadSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SpreadSystem {
    fn name(&self) -> &str {
        "spread"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        network: &mut Network,
        rng: &mut SystemRng<'_>,
    ) -> SimResult<()> {
        let spread = SpreadEngine::new(&ctx.tuning.spread);
        let policy = Countermeasures::new(&ctx.tuning.policy);
        let Network {
            graph,
            counties,
            neighbors,
        } = network;

        for position in 0..counties.len() {
            let Some(name) = counties.at(position).map(|county| county.name.clone()) else {
                continue;
            };
            for neighbor_name in neighbors.neighbors(&name) {
                let Some(neighbor_position) = counties.position(neighbor_name) else {
                    warn!(county = %name, neighbor = %neighbor_name, "neighbor missing from county map, skipping");
                    continue;
                };
                let Some((source, neighbor)) = counties.pair_mut(position, neighbor_position) else {
                    continue;
                };
                let pair = Pair {
                    spread: &spread,
                    policy: &policy,
                    run_mode: ctx.run_mode,
                    month: ctx.month.month,
                };
                if let Err(err) = pair.step(graph, source, neighbor, rng) {
                    if !err.is_recoverable() {
                        return Err(err);
                    }
                    warn!(county = %name, neighbor = %neighbor_name, error = %err, "skipping pair");
                }
            }
        }
        Ok(())
    }
}

struct Pair<'a> {
    spread: &'a SpreadEngine<'a>,
    policy: &'a Countermeasures<'a>,
    run_mode: RunMode,
    month: Month,
}

impl Pair<'_> {
    /// Probability first, then the policy, then the transfer.
    fn step<R: Rng + ?Sized>(
        &self,
        graph: &mut CountyGraph,
        source: &mut County,
        neighbor: &mut County,
        rng: &mut R,
    ) -> SimResult<()> {
        let probability = self.spread.probability(graph, source, neighbor, rng)?;
        self.policy
            .apply(self.run_mode, graph, source, neighbor, rng)?;
        self.spread
            .transfer(source, neighbor, probability, self.month, rng);
        Ok(())
    }
}
