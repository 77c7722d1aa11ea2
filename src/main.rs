use anyhow::Result;
use clap::Parser;
use env_logger::Builder;
use log::{debug, error, info, trace, warn, LevelFilter};
use std::path::PathBuf;
use std::time::Instant;

use segregation_common::SimulationConfig;
use segregation_engine::output::{save_snapshots, write_metrics_csv};
use segregation_engine::SchellingSimulation;

/// Command-line arguments for the headless runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config.toml file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Number of steps to run (overrides timing.total_steps)
    #[arg(long)]
    steps: Option<u32>,

    /// RNG seed (overrides population.seed)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();

    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    info!("Starting Segregation Engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if let Some(steps) = args.steps {
        config.timing.total_steps = steps;
    }
    if let Some(seed) = args.seed {
        config.population.seed = Some(seed);
    }
    debug!("Configuration: {:#?}", config);
    if config.population.seed.is_none() {
        warn!("No seed configured; this run will not be reproducible.");
    }

    // --- Initialize World ---
    let mut sim = SchellingSimulation::from_config(&config)?;
    sim.create_random_neighbourhood()?;
    info!(
        "World {}x{} initialized with {} agents.",
        sim.world().width(),
        sim.world().height(),
        sim.world().agent_count()
    );

    let total_steps = config.timing.total_steps;
    let mut record_interval_steps = config.timing.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("Record interval is 0 steps. Recording after every step.");
        record_interval_steps = 1;
    }
    info!("Recording metrics every {} steps.", record_interval_steps);

    // --- Initial Snapshot (step 0) ---
    sim.record_snapshot();

    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    let mut moves = 0u64;

    for step in 0..total_steps {
        let outcome = match sim.step() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Error during simulation step {}: {}", step + 1, e);
                anyhow::bail!("Simulation step failed.");
            }
        };
        if outcome.moved() {
            moves += 1;
        }

        let current_time = Instant::now();
        let should_print_status = current_time.duration_since(previous_print_time).as_secs_f64() >= 5.0;
        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;

        if is_record_step || is_last_step {
            let snapshot = sim.record_snapshot();
            info!(
                "Step [{}/{}] | Segregation: {} | Unhappy: {} | Moves so far: {}",
                step + 1,
                total_steps,
                format_ratio(snapshot.segregation),
                format_ratio(snapshot.unhappiness),
                moves
            );
            previous_print_time = current_time;
        } else if should_print_status {
            info!("Step [{}/{}] | Elapsed: {:.2} s", step + 1, total_steps, start_time.elapsed().as_secs_f64());
            previous_print_time = current_time;
        } else {
            trace!("Step [{}/{}] moved={} relocations={}", step + 1, total_steps, outcome.moved(), outcome.relocations);
        }
    }

    info!(
        "Simulation finished in {:.3} seconds ({} of {} steps relocated an agent).",
        start_time.elapsed().as_secs_f64(),
        moves,
        total_steps
    );

    // --- Save Recorded Data ---
    let output = &config.output;
    if output.save_stats {
        save_snapshots(sim.recorded_snapshots(), output)?;
    } else {
        info!("Skipping saving snapshots as per config (save_stats is false).");
    }
    if output.save_csv {
        let filename = PathBuf::from(format!("{}_metrics.csv", output.base_filename));
        write_metrics_csv(sim.recorded_snapshots(), &filename)?;
    }

    info!("Simulation Complete.");
    Ok(())
}

fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.4}", v))
}
