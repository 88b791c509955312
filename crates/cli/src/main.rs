//! dlsim CLI - deadlock simulation driver.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dlsim_core::{DeadlockEvent, Units};
use dlsim_engine::{AllocationEngine, DeadlockListener};
use dlsim_prevention::PreventionStrategy;
use dlsim_scenario::ScenarioSynthesizer;

#[derive(Parser)]
#[command(name = "dlsim")]
#[command(about = "Deadlock detection, avoidance and recovery simulator", long_about = None)]
struct Cli {
    /// Resolve any detected deadlock, looping until none remains
    #[arg(long, global = true)]
    resolve: bool,

    /// Print a prevention strategy report (e.g. wait-die, preemption)
    #[arg(long, global = true)]
    strategy: Option<PreventionStrategy>,

    /// Dump the final system state as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Circular-wait chain: process i holds R(i), requests R(i+1)
    CircularWait {
        /// Number of processes (and resources)
        #[arg(long, default_value = "4")]
        processes: usize,
    },
    /// Dining philosophers around single-unit forks
    Philosophers {
        /// Number of philosophers
        #[arg(long, default_value = "5")]
        count: usize,
    },
    /// Randomized allocation with optional deadlock injection
    Random {
        /// Number of processes
        #[arg(long, default_value = "5")]
        processes: usize,
        /// Number of resource classes
        #[arg(long, default_value = "3")]
        resources: usize,
        /// Probability of injecting a circular request chain
        #[arg(long, default_value = "0.5")]
        probability: f64,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Logs lifecycle events as they happen.
struct LoggingListener;

impl DeadlockListener for LoggingListener {
    fn on_deadlock_detected(&mut self, processes: &[usize], _event: &DeadlockEvent) {
        info!(?processes, "deadlock detected");
    }

    fn on_deadlock_resolved(&mut self, processes: &[usize], strategy: &str) {
        info!(?processes, strategy, "deadlock resolved");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    // Placeholder dimensions; every subcommand re-initializes.
    let mut engine = AllocationEngine::new(1, 1, vec![0])?;
    engine.add_deadlock_listener(Box::new(LoggingListener));

    match cli.command {
        Commands::CircularWait { processes } => {
            ScenarioSynthesizer::new().circular_wait(&mut engine, processes)?;
            println!("Circular-wait scenario with {processes} processes");
        }
        Commands::Philosophers { count } => {
            ScenarioSynthesizer::new().dining_philosophers(&mut engine, count)?;
            println!("Dining philosophers with {count} philosophers");
        }
        Commands::Random {
            processes,
            resources,
            probability,
            seed,
        } => {
            let mut synth = match seed {
                Some(seed) => ScenarioSynthesizer::with_seed(seed),
                None => ScenarioSynthesizer::new(),
            };
            synth.random(&mut engine, processes, resources, probability)?;
            println!(
                "Random scenario: {processes} processes, {resources} resources, \
                 deadlock probability {probability}"
            );
        }
    }

    report(&mut engine);

    if let Some(strategy) = cli.strategy {
        println!();
        println!("{}", engine.apply_prevention(strategy));
    }

    if cli.resolve {
        resolve_to_fixpoint(&mut engine)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(engine.current_state())?);
    }

    Ok(())
}

fn report(engine: &mut AllocationEngine) {
    println!();
    print_matrix("Allocation", engine.safety().allocation());
    print_matrix("Max", engine.safety().max());
    print_matrix("Need", engine.safety().need());
    print_vector("Available", engine.safety().available());

    println!();
    match engine.safety().safe_sequence() {
        Some(sequence) => {
            let order: Vec<String> = sequence.iter().map(|p| format!("P{p}")).collect();
            println!("Safety: SAFE (completion order {})", order.join(" -> "));
        }
        None => println!("Safety: UNSAFE (no completion order exists)"),
    }

    if engine.detect_deadlock() {
        let deadlocked: Vec<String> = engine
            .deadlocked_processes()
            .iter()
            .map(|p| format!("P{p}"))
            .collect();
        println!("Deadlock: YES, involving {}", deadlocked.join(", "));
    } else {
        println!("Deadlock: none");
    }
}

/// The collaborator-side loop: the engine terminates one victim per
/// call, so keep resolving until detection goes quiet.
fn resolve_to_fixpoint(engine: &mut AllocationEngine) -> Result<()> {
    let mut victims = Vec::new();
    while let Some(victim) = engine.resolve_deadlock()? {
        victims.push(victim);
    }

    println!();
    if victims.is_empty() {
        println!("Nothing to resolve.");
    } else {
        let terminated: Vec<String> = victims.iter().map(|p| format!("P{p}")).collect();
        println!("Resolved by terminating {}", terminated.join(", "));
        print_vector("Available now", engine.safety().available());
    }

    let tracker = engine.tracker();
    println!(
        "Stats: {} detected, {} resolved, {} prevented, avg resolution {:.1} ms",
        tracker.total_deadlocks(),
        tracker.resolved_deadlocks(),
        tracker.prevented_deadlocks(),
        tracker.average_resolution_ms(),
    );
    Ok(())
}

fn print_matrix(name: &str, matrix: &[Vec<Units>]) {
    println!("{name}:");
    for (p, row) in matrix.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(|u| format!("{u:>3}")).collect();
        println!("  P{p} [{}]", cells.join(" "));
    }
}

fn print_vector(name: &str, vector: &[Units]) {
    let cells: Vec<String> = vector.iter().map(|u| format!("{u:>3}")).collect();
    println!("{name}: [{}]", cells.join(" "));
}
