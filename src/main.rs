//! Headless driver: runs one track with one controller and appends the result

use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use drivesim::core::elapsed_label;
use drivesim::prelude::*;

#[derive(Parser)]
#[command(name = "drivesim")]
#[command(about = "Drive an agent around a track with an FSM or fuzzy controller", long_about = None)]
struct Cli {
    /// Simulation config (.ron or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Track description (.ron or .json); the built-in track when omitted
    #[arg(long)]
    track: Option<PathBuf>,

    /// Controller to drive with (fsm or fuzzy)
    #[arg(long)]
    controller: Option<ControllerKind>,

    /// Results log the run is appended to
    #[arg(long)]
    results: Option<PathBuf>,

    /// Give up after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Write the track description to this file and exit
    #[arg(long)]
    export_track: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(controller) = cli.controller {
        config = config.with_controller(controller);
    }
    if let Some(results) = cli.results {
        config = config.with_results_path(results);
    }
    if let Some(max_ticks) = cli.max_ticks {
        config = config.with_max_ticks(max_ticks);
    }
    config.validate()?;

    let description = match &cli.track {
        Some(path) => TrackDescription::load(path)?,
        None => TrackDescription::demo(),
    };
    if let Some(path) = &cli.export_track {
        description.save(path)?;
        log::info!("Track written to {}", path.display());
        return Ok(());
    }
    let track = description.build()?;

    let results = ResultsLog::new(&config.results_path);
    let outcome = match config.controller {
        ControllerKind::Fsm => drive(
            track,
            FiniteStateController::new(&config.agent),
            &config,
            results.clone(),
        ),
        ControllerKind::Fuzzy => drive(
            track,
            FuzzyController::new(&config.agent),
            &config,
            results.clone(),
        ),
    };

    match &outcome.result {
        Some(result) => {
            print!("{}", result.to_record());
            println!("{}", elapsed_label(result.elapsed_seconds));
        }
        None => println!("Run did not finish within {} ticks", outcome.ticks),
    }
    match results.read_all() {
        Ok(records) => println!(
            "{} run(s) recorded in {}",
            records.len(),
            results.path().display()
        ),
        Err(e) => log::warn!("Could not read back {}: {e}", results.path().display()),
    }

    Ok(())
}

fn drive<C: DecisionStrategy>(
    track: Track,
    strategy: C,
    config: &SimConfig,
    results: ResultsLog,
) -> RunOutcome {
    Simulation::new(track, strategy, config)
        .with_sink(results)
        .run()
}
