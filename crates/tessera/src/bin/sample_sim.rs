//! # Sample Simulation
//!
//! Runs one headless battle and prints the result.
//!
//! Usage: `sample_sim [config.toml]`

use std::process::ExitCode;
use std::time::Instant;

use tessera::{SampleConfig, SampleResult, SimReport, Simulation};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sample_sim: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> SampleResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => SampleConfig::from_toml_file(path)?,
        None => SampleConfig::default(),
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 TESSERA - SAMPLE SIMULATION                      ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ Ships:              {}", config.ships);
    println!("│ Seed:               {}", config.seed);
    println!("│ Max Ticks:          {}", config.ticks);
    println!("│ Tick Length:        {:.4} s", config.delta_seconds);
    println!("│ Arena Radius:       {}", config.arena_radius);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let start = Instant::now();
    let mut simulation = Simulation::new(config)?;
    let report = simulation.run()?;
    let elapsed = start.elapsed();

    print_report(&report, elapsed.as_secs_f64());
    Ok(())
}

fn print_report(report: &SimReport, seconds: f64) {
    println!("┌─ RESULTS ───────────────────────────────────────────────────────┐");
    println!("│ Ticks Run:          {}", report.ticks);
    println!("│ Real Time:          {seconds:.3} s");
    println!(
        "│ Avg Tick:           {:.1} μs",
        seconds * 1_000_000.0 / f64::from(report.ticks.max(1))
    );
    println!("│ Hits:               {}", report.hits);
    println!("│ Messages Delivered: {}", report.messages_delivered);
    println!("│ Messages Dropped:   {}", report.messages_dropped);
    println!("│ Component Updates:  {}", report.components_updated);
    println!("│ Peak Objects:       {}", report.peak_objects);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    println!("┌─ SCOREBOARD ────────────────────────────────────────────────────┐");
    for (player, kills) in report.kills.iter().enumerate() {
        let status = if report.survivors.iter().any(|&p| usize::from(p) == player) {
            "✓ FLYING"
        } else {
            "✗ DESTROYED"
        };
        println!("│ Player {player:>2}:  {kills:>3} kills   {status}");
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
}
