use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use flightstage::config::FlightstageConfig;
use flightstage::simulation::{run_path_demo, run_scene_demo, PathDemoReport, SceneDemoReport};
use flightstage::telemetry::{init_telemetry, shutdown_telemetry};
use flightstage::ShutdownCoordinator;

#[derive(Parser)]
#[command(name = "flightstage")]
#[command(about = "Single-flight background computation and staged scene transitions")]
#[command(long_about = "Flightstage drives two simulations: a frame loop whose units poll a \
                       single-flight gate for slow path computations, and a scene swap \
                       sequenced behind a loading screen.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the frame loop where every unit polls for its path
    Paths {
        /// Number of units polling the gate
        #[arg(long, help = "Override the configured number of units")]
        units: Option<usize>,
        /// Time one path computation blocks for
        #[arg(long, help = "Override the path computation latency in milliseconds")]
        compute_ms: Option<u64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Swap an active scene for a new one behind a loading screen
    Transition {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to this TOML file
        #[arg(long, help = "Write the effective configuration to a file")]
        write: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = flightstage::config()?.clone();
    init_telemetry(&config.observability)?;

    let result = match cli.command {
        Commands::Paths {
            units,
            compute_ms,
            json,
        } => {
            let mut config = config;
            if let Some(units) = units {
                config.simulation.unit_count = units;
            }
            if let Some(compute_ms) = compute_ms {
                config.simulation.path_compute_ms = compute_ms;
            }
            tokio::runtime::Runtime::new()?.block_on(async { paths_command(&config, json).await })
        }
        Commands::Transition { json } => tokio::runtime::Runtime::new()?
            .block_on(async { transition_command(&config, json).await }),
        Commands::Config { write } => config_command(&config, write),
    };

    shutdown_telemetry();
    result
}

async fn paths_command(config: &FlightstageConfig, json: bool) -> Result<()> {
    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers()?;

    if !json {
        println!(
            "🧭 Simulating {} units at {} fps ({}ms per path computation)",
            config.simulation.unit_count,
            config.simulation.frame_rate,
            config.simulation.path_compute_ms
        );
    }

    let report = run_path_demo(&config.simulation, &config.flight, &shutdown.token()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_path_report(&report);
    }
    Ok(())
}

fn print_path_report(report: &PathDemoReport) {
    println!();
    if report.cancelled {
        println!("⚠️  Simulation cancelled before every path finished");
    } else {
        println!("✅ All {} units finished their paths", report.units);
    }
    println!("   📦 Paths requested: {}", report.paths_requested);
    println!("   🏁 Paths finished:  {}", report.paths_finished);
    println!("   🎞️  Frames:          {}", report.frames);
    println!("   ⏱️  Elapsed:         {}ms", report.elapsed_ms);
    println!("   📈 Average FPS:     {:.1}", report.fps);
    println!(
        "   🔒 Peak in flight:  {} (rejected completions: {})",
        report.gate.peak_in_flight, report.gate.rejected_completions
    );
}

async fn transition_command(config: &FlightstageConfig, json: bool) -> Result<()> {
    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers()?;

    if !json {
        println!("🎬 Swapping oldScene for newScene behind the loading screen");
    }

    let report = run_scene_demo(&config.transition, &shutdown.token()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scene_report(&report);
    }
    Ok(())
}

fn print_scene_report(report: &SceneDemoReport) {
    println!();
    for step in &report.transition.steps {
        println!("   ▶️  {:<18} {}ms", step.step, step.elapsed_ms);
    }
    println!();
    for entry in &report.timeline {
        println!(
            "   {:>6}ms  {:<14} {}",
            entry.offset_ms, entry.resource, entry.event
        );
    }
    println!();
    println!(
        "✅ Transition complete in {}ms (correlation id {})",
        report.transition.elapsed_ms, report.transition.correlation_id
    );
}

fn config_command(config: &FlightstageConfig, write: Option<PathBuf>) -> Result<()> {
    match write {
        Some(path) => {
            config.save_to_file(&path)?;
            println!("💾 Configuration written to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
