use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    error::SimResult,
    network::Network,
    rng::SystemRng,
    spread::SpreadEngine,
};

/// Seasonal transitions: hatch in spring, mate and lay in late summer and
/// autumn, die off in winter.
pub struct LifecycleSystem;

impl LifecycleSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LifecycleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifecycleSystem {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        network: &mut Network,
        rng: &mut SystemRng<'_>,
    ) -> SimResult<()> {
        let config = &ctx.tuning.lifecycle;
        let month = ctx.month.month;
        let hatch = config.hatch_months.contains(&month);
        let mate = config.mating_months.contains(&month);
        let lay = config.laying_months.contains(&month);
        let die = config.die_off_months.contains(&month);
        if !(hatch || mate || lay || die) {
            return Ok(());
        }
        debug!(step = ctx.step, %month, hatch, mate, lay, die, "life cycle");

        for county in network.counties.iter_mut() {
            if hatch {
                let chance = config.hatch_chance.sample(rng);
                county.hatch_eggs(Some(chance), rng);
            }
            if mate {
                let chance = config.mating_chance.sample(rng);
                county.mate(Some(chance), rng);
            }
            if lay {
                let extra = config.extra_egg_chance.sample(rng);
                county.lay_eggs(config.egg_scaling, extra);
            }
            if die {
                let mortality = config.winter_mortality.sample(rng);
                county.die_off(Some(mortality), rng);
            }
        }
        Ok(())
    }
}

/// Natural growth standing in for the life cycle when it is switched off.
pub struct GrowthSystem;

impl GrowthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrowthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GrowthSystem {
    fn name(&self) -> &str {
        "growth"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        network: &mut Network,
        rng: &mut SystemRng<'_>,
    ) -> SimResult<()> {
        let engine = SpreadEngine::new(&ctx.tuning.spread);
        for county in network.counties.iter_mut() {
            engine.grow(county, rng);
        }
        Ok(())
    }
}
