use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{LifecyclePhase, Tuning},
    countermeasures::RunMode,
    error::{SimResult, SimulationError},
    months::{Month, MonthCycle, MonthEntry},
    network::{CountyMap, Network},
    overlay::Overlay,
    rng::{RngManager, SystemRng},
    systems::{GrowthSystem, LifecycleSystem, SpreadSystem},
    table::ResultTable,
};

/// A validated, strictly positive step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Iterations(u64);

impl Iterations {
    /// One simulated year.
    pub const DEFAULT: Iterations = Iterations(12);

    pub fn new(count: u64) -> SimResult<Self> {
        if count == 0 {
            return Err(SimulationError::InvalidArgument(
                "iterations must be a positive integer, got 0".into(),
            ));
        }
        Ok(Self(count))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Iterations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Iterations> for u64 {
    fn from(value: Iterations) -> Self {
        value.0
    }
}

impl TryFrom<i64> for Iterations {
    type Error = SimulationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(SimulationError::InvalidArgument(format!(
                "iterations must be a positive integer, got {value}"
            )));
        }
        Self::new(value as u64)
    }
}

impl TryFrom<f64> for Iterations {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 || value <= 0.0 || value > u64::MAX as f64 {
            return Err(SimulationError::InvalidArgument(format!(
                "iterations must be a positive integer, got {value}"
            )));
        }
        Self::new(value as u64)
    }
}

impl FromStr for Iterations {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => Self::try_from(value),
            Err(_) => Err(SimulationError::InvalidArgument(format!(
                "iterations must be a positive integer, got '{trimmed}'"
            ))),
        }
    }
}

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    pub run_mode: RunMode,
    pub lifecycle_enabled: bool,
    pub tuning: Tuning,
    pub overlay: Overlay,
    /// Extra per-month levels, keyed by attribute name, carried on each
    /// [`MonthEntry`] the systems see.
    pub month_attributes: BTreeMap<String, HashMap<Month, f64>>,
}

impl EngineSettings {
    pub fn new(scenario_name: impl Into<String>, seed: u64) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            seed,
            run_mode: RunMode::Baseline,
            lifecycle_enabled: true,
            tuning: Tuning::default(),
            overlay: Overlay::default(),
            month_attributes: BTreeMap::new(),
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// The usual system order: the life cycle (or natural growth when it is
    /// disabled) placed before or after spread according to the tuning.
    pub fn standard(settings: EngineSettings) -> Self {
        let lifecycle_enabled = settings.lifecycle_enabled;
        let phase = settings.tuning.lifecycle.phase;
        let builder = Self::new(settings);
        if !lifecycle_enabled {
            return builder
                .with_system(GrowthSystem::new())
                .with_system(SpreadSystem::new());
        }
        match phase {
            LifecyclePhase::BeforeSpread => builder
                .with_system(LifecycleSystem::new())
                .with_system(SpreadSystem::new()),
            LifecyclePhase::AfterSpread => builder
                .with_system(SpreadSystem::new())
                .with_system(LifecycleSystem::new()),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        let months = self
            .settings
            .month_attributes
            .iter()
            .fold(MonthCycle::new(), |months, (name, values)| {
                months.with_attribute(name, values)
            });
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            months,
            state: DriverState::Init,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Stepping,
    Done,
}

/// Aggregate view of one completed step, handed to run hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub step: u64,
    pub month: Month,
    pub mean_saturation: f64,
    pub infested: usize,
    pub quarantined: usize,
    pub aware: usize,
}

impl StepSummary {
    pub fn collect(step: u64, month: Month, counties: &CountyMap) -> Self {
        let mut total = 0.0;
        let (mut infested, mut quarantined, mut aware) = (0, 0, 0);
        for county in counties.iter() {
            total += county.saturation;
            infested += usize::from(county.saturation > 0.0);
            quarantined += usize::from(county.quarantine);
            aware += usize::from(county.public_awareness);
        }
        let mean_saturation = if counties.is_empty() {
            0.0
        } else {
            total / counties.len() as f64
        };
        Self {
            step,
            month,
            mean_saturation,
            infested,
            quarantined,
            aware,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    months: MonthCycle,
    state: DriverState,
    settings: EngineSettings,
}

impl Engine {
    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn run(&mut self, network: &mut Network, iterations: Iterations) -> SimResult<ResultTable> {
        self.run_with_hook(network, iterations, |_| {})
    }

    pub fn run_with_hook<F>(
        &mut self,
        network: &mut Network,
        iterations: Iterations,
        mut hook: F,
    ) -> SimResult<ResultTable>
    where
        F: FnMut(&StepSummary),
    {
        self.state = DriverState::Init;
        self.months.reset();
        let applied = self.settings.overlay.apply(&mut network.counties);
        network.refresh_neighbors();
        let mut table = ResultTable::seeded(&network.counties);
        info!(
            scenario = %self.settings.scenario_name,
            run_mode = %self.settings.run_mode,
            iterations = iterations.get(),
            counties = network.counties.len(),
            overlay = applied,
            "starting run"
        );

        self.state = DriverState::Stepping;
        for step in 1..=iterations.get() {
            let entry = self.months.rotate();
            for county in network.counties.iter_mut() {
                county.traffic_level = entry.traffic_level;
            }
            for system in &mut self.systems {
                let mut rng_stream = self.rng.stream(system.name());
                let ctx = SystemContext {
                    step,
                    month: &entry,
                    run_mode: self.settings.run_mode,
                    tuning: &self.settings.tuning,
                };
                system.run(&ctx, network, &mut rng_stream)?;
            }
            table.record(&network.counties)?;

            let summary = StepSummary::collect(step, entry.month, &network.counties);
            debug!(
                step,
                month = %entry.month,
                mean_saturation = summary.mean_saturation,
                quarantined = summary.quarantined,
                "step complete"
            );
            hook(&summary);
        }

        self.state = DriverState::Done;
        info!(
            scenario = %self.settings.scenario_name,
            columns = table.column_count(),
            "run finished"
        );
        Ok(table)
    }
}

/// String-typed entry point. Both arguments are validated before the
/// network is touched.
pub fn run_simulation(
    network: &mut Network,
    mut settings: EngineSettings,
    iterations: &str,
    run_mode: &str,
) -> SimResult<ResultTable> {
    let iterations: Iterations = iterations.parse()?;
    settings.run_mode = run_mode.parse()?;
    EngineBuilder::standard(settings).build().run(network, iterations)
}

pub struct SystemContext<'a> {
    pub step: u64,
    pub month: &'a MonthEntry,
    pub run_mode: RunMode,
    pub tuning: &'a Tuning,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        network: &mut Network,
        rng: &mut SystemRng<'_>,
    ) -> SimResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterations_accept_positive_integers() {
        assert_eq!("12".parse::<Iterations>().unwrap().get(), 12);
        assert_eq!(" 3 ".parse::<Iterations>().unwrap().get(), 3);
        assert_eq!(Iterations::try_from(4.0).unwrap().get(), 4);
        assert_eq!(Iterations::try_from(7_i64).unwrap().get(), 7);
    }

    #[test]
    fn iterations_reject_bad_input() {
        for input in ["-3", "2.5", "abc", "0", ""] {
            assert!(
                matches!(input.parse::<Iterations>(), Err(SimulationError::InvalidArgument(_))),
                "{input:?} should be rejected"
            );
        }
        assert!(Iterations::try_from(2.5).is_err());
        assert!(Iterations::try_from(f64::NAN).is_err());
        assert!(Iterations::try_from(-1_i64).is_err());
        assert!(Iterations::new(0).is_err());
    }

    #[test]
    fn iterations_deserialize_with_validation() {
        let ok: Iterations = serde_yaml::from_str("24").unwrap();
        assert_eq!(ok.get(), 24);
        assert!(serde_yaml::from_str::<Iterations>("-1").is_err());
        assert!(serde_yaml::from_str::<Iterations>("0").is_err());
    }

    #[test]
    fn step_summary_counts_flags() {
        let mut counties = CountyMap::new();
        let mut cook = crate::county::County::new("Cook").with_saturation(0.8);
        cook.quarantine = true;
        cook.public_awareness = true;
        counties.insert(cook);
        counties.insert(crate::county::County::new("Will"));
        let summary = StepSummary::collect(3, Month::March, &counties);
        assert_eq!(summary.infested, 1);
        assert_eq!(summary.quarantined, 1);
        assert_eq!(summary.aware, 1);
        assert!((summary.mean_saturation - 0.4).abs() < 1e-12);
    }

    struct Thermometer {
        seen: std::rc::Rc<std::cell::RefCell<Vec<(Month, Option<f64>)>>>,
    }

    impl System for Thermometer {
        fn name(&self) -> &str {
            "thermometer"
        }

        fn run(
            &mut self,
            ctx: &SystemContext,
            _network: &mut Network,
            _rng: &mut SystemRng<'_>,
        ) -> SimResult<()> {
            let level = ctx.month.attributes.get("temperature").copied();
            self.seen.borrow_mut().push((ctx.month.month, level));
            Ok(())
        }
    }

    #[test]
    fn month_attributes_reach_systems() {
        let mut settings = EngineSettings::new("attributes", 1);
        settings.month_attributes.insert(
            "temperature".to_string(),
            [(Month::February, 0.2)].into_iter().collect(),
        );
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut engine = EngineBuilder::new(settings)
            .with_system(Thermometer { seen: seen.clone() })
            .build();
        let mut network = Network::default();
        engine.run(&mut network, Iterations::new(3).unwrap()).unwrap();
        assert_eq!(
            *seen.borrow(),
            [
                (Month::January, None),
                (Month::February, Some(0.2)),
                (Month::March, None)
            ]
        );
    }

    #[test]
    fn standard_builder_orders_systems_by_phase() {
        let mut settings = EngineSettings::new("order", 1);
        settings.tuning.lifecycle.phase = LifecyclePhase::AfterSpread;
        let engine = EngineBuilder::standard(settings).build();
        let names: Vec<_> = engine.systems.iter().map(|system| system.name().to_string()).collect();
        assert_eq!(names, ["spread", "lifecycle"]);

        let mut settings = EngineSettings::new("order", 1);
        settings.lifecycle_enabled = false;
        let engine = EngineBuilder::standard(settings).build();
        let names: Vec<_> = engine.systems.iter().map(|system| system.name().to_string()).collect();
        assert_eq!(names, ["growth", "spread"]);
        assert_eq!(engine.state(), DriverState::Init);
    }
}
