pub mod builder;
pub mod config;
pub mod countermeasures;
pub mod county;
pub mod engine;
pub mod error;
pub mod months;
pub mod neighbors;
pub mod network;
pub mod overlay;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod spread;
pub mod systems;
pub mod table;

pub use countermeasures::RunMode;
pub use county::County;
pub use engine::{Engine, EngineBuilder, EngineSettings, Iterations, StepSummary};
pub use error::{SimResult, SimulationError};
pub use network::{CountyGraph, CountyMap, Network, Relation};
pub use scenario::Scenario;
pub use table::ResultTable;
