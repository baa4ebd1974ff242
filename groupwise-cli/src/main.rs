//! groupwise - hierarchical robust aggregation experiments
//! Command-line interface for running simulated federations

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use groupwise_sim::{ExperimentConfig, ExperimentReport, Federation};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "groupwise")]
#[command(author = "Groupwise Contributors")]
#[command(version = "2026.10.1")]
#[command(about = "Hierarchical robust aggregation for adversarial federated learning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated federation
    Run {
        /// Experiment configuration (.toml); defaults are used when omitted
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Override the configured number of rounds
        #[arg(short, long)]
        rounds: Option<usize>,

        /// Override the experiment seed
        #[arg(long)]
        seed: Option<u64>,

        /// Write the round ledger as JSON
        #[arg(short, long, value_name = "OUTPUT")]
        ledger: Option<PathBuf>,

        /// Print the experiment report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the default experiment configuration as TOML
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Show information about groupwise
    Info,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupwise=info,groupwise_core=info,groupwise_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            rounds,
            seed,
            ledger,
            json,
        } => run_command(config.as_deref(), rounds, seed, ledger.as_deref(), json),
        Commands::Config { output } => config_command(output.as_deref()),
        Commands::Info => {
            print_info();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_command(
    config_path: Option<&Path>,
    rounds: Option<usize>,
    seed: Option<u64>,
    ledger_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => ExperimentConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    if let Some(rounds) = rounds {
        config.rounds = rounds;
    }
    if let Some(seed) = seed {
        config.seed = seed;
        config.aggregator.seed = seed;
    }

    if !json {
        println!(
            "{} '{}' with {} clients over {} rounds",
            "Running".green().bold(),
            config.name.cyan(),
            config.clients,
            config.rounds
        );
    }

    let mut federation = Federation::new(config).context("failed to set up federation")?;
    let report = federation.run().context("experiment aborted")?;

    if let Some(path) = ledger_path {
        federation
            .aggregator()
            .ledger()
            .write_json(path)
            .with_context(|| format!("failed to write ledger to {}", path.display()))?;
        info!(path = %path.display(), rounds = report.rounds.len(), "ledger written");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        if let Some(path) = ledger_path {
            println!("{} ledger to {}", "Wrote".green().bold(), path.display());
        }
    }
    Ok(())
}

fn config_command(output: Option<&Path>) -> Result<()> {
    let toml = ExperimentConfig::default().to_toml()?;
    match output {
        Some(path) => {
            fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} default configuration to {}", "Wrote".green().bold(), path.display());
        }
        None => print!("{}", toml),
    }
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_report(report: &ExperimentReport) {
    println!();
    println!(
        "{}",
        format!("{:>5}  {:>10}  {:>5}  {:<9}  {:<16}  {}", "round", "error", "iter", "converged", "members", "flagged")
            .bold()
    );
    for summary in &report.rounds {
        let converged = if summary.converged {
            "yes".green()
        } else {
            "no".yellow()
        };
        let members = format!("{:?}", summary.member_counts);
        println!(
            "{:>5}  {:>10.6}  {:>5}  {:<9}  {:<16}  {}",
            summary.round,
            summary.error,
            summary.iterations,
            converged,
            members,
            summary.flagged.len()
        );
    }

    println!();
    println!("{}", "Set aside across all rounds:".bold());
    println!("  benign      {}", report.blocked.benign);
    println!("  faulty      {}", report.blocked.faulty);
    println!("  malicious   {}", report.blocked.malicious);
    println!("  free riders {}", report.blocked.free_rider);

    if let Some(error) = report.final_error() {
        println!();
        println!("{} final error {:.6}", "Done:".green().bold(), error);
    }
}

fn print_info() {
    println!("{}", "groupwise - hierarchical robust aggregation".bold());
    println!();
    println!("Groups client updates by cosine similarity, aggregates inside each group");
    println!("with an internal strategy, then combines the groups weighted by size.");
    println!();
    println!("{}", "Strategies:".bold());
    println!("  • {} weighted_mean", "✓".green());
    println!("  • {} coordinate_median", "✓".green());
    println!("  • {} trimmed_mean {{ trim_ratio }}", "✓".green());
    println!("  • {} multi_krum {{ byzantine_count }}", "✓".green());
    println!();
    println!("{}", "Round:".bold());
    println!("  client updates");
    println!("       ↓");
    println!("  similarity clustering (K fixed)");
    println!("       ↓");
    println!("  internal strategy per cluster");
    println!("       ↓");
    println!("  external strategy across clusters");
    println!("       ↓");
    println!("  global model + ledger record");
    println!();
    println!("{}", "Commands:".bold());
    println!("  groupwise config > experiment.toml       # Default configuration");
    println!("  groupwise run -c experiment.toml         # Run an experiment");
    println!("  groupwise run -r 20 -l ledger.json       # Override rounds, keep the ledger");
    println!("  groupwise run --json                     # Machine-readable report");
    println!();
    println!("Set RUST_LOG=groupwise_core=debug to trace clustering iterations.");
}
