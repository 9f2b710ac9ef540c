use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lanternfly::{
    countermeasures::RunMode,
    engine::{EngineBuilder, Iterations},
    scenario::ScenarioLoader,
    snapshot::{FinalSnapshot, NetworkStore},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Spotted lanternfly spread simulator")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/tri_county.yaml")]
    scenario: PathBuf,

    /// Number of monthly steps (uses the scenario value when omitted)
    #[arg(long)]
    iterations: Option<String>,

    /// Countermeasure policy: Baseline, "Poison ToH", Population-Based, Quarantine or All
    #[arg(long)]
    run_mode: Option<String>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the result table here (.json for JSON, CSV otherwise)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for the persisted network blobs and the final snapshot
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Replace the seasonal life cycle with plain growth
    #[arg(long)]
    no_lifecycle: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&scenario.logging.level)),
        )
        .with_target(true)
        .init();

    let iterations = cli
        .iterations
        .as_deref()
        .map(str::parse::<Iterations>)
        .transpose()?;
    let run_mode = cli
        .run_mode
        .as_deref()
        .map(str::parse::<RunMode>)
        .transpose()?;
    let iterations = scenario.iterations(iterations);
    let run_mode = scenario.run_mode(run_mode);
    let seed = cli.seed.unwrap_or(scenario.seed);
    let lifecycle = scenario.lifecycle && !cli.no_lifecycle;

    let mut network = scenario.build_network();
    if let Some(dir) = &cli.state_dir {
        NetworkStore::new(dir)
            .with_prefix(format!("{}_", scenario.name))
            .save(&network)
            .with_context(|| format!("Failed to persist network for {}", scenario.name))?;
    }

    let settings = scenario.engine_settings(run_mode, seed, lifecycle);
    let mut engine = EngineBuilder::standard(settings).build();
    let table = engine.run_with_hook(&mut network, iterations, |summary| {
        info!(
            step = summary.step,
            month = %summary.month,
            mean_saturation = summary.mean_saturation,
            quarantined = summary.quarantined,
            aware = summary.aware,
            "step"
        );
    })?;

    if let Some(path) = &cli.output {
        table
            .export(path)
            .with_context(|| format!("Failed to write results to {}", path.display()))?;
        info!(path = %path.display(), "result table written");
    }
    if let Some(dir) = &cli.state_dir {
        let snapshot = FinalSnapshot::capture(&scenario.name, run_mode, iterations.get(), &network);
        let path = snapshot.write(dir)?;
        info!(path = %path.display(), "final snapshot written");
    }

    let mean = table
        .last_column()
        .map(|column| column.iter().sum::<f64>() / column.len().max(1) as f64)
        .unwrap_or_default();
    println!(
        "Scenario '{}' ({}) completed for {} steps. Mean saturation: {:.4}",
        scenario.name, run_mode, iterations, mean
    );
    Ok(())
}
