//! Tessera CLI - run, replay and benchmark tactical match-3 matches.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tessera::game::RegimentStats;
use tracing_subscriber::EnvFilter;

/// Tessera - a deterministic match-3 combat rules engine
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log engine decisions at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single AI-vs-AI match
    Run {
        /// Random seed (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Engine configuration JSON (default: built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Save recording to file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Only print the result
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run many matches in parallel and aggregate statistics
    Tournament {
        /// Number of matches to run (default: 100)
        #[arg(short, long, default_value = "100")]
        games: u64,

        /// Starting seed (increments for each match)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Engine configuration JSON (default: built-in)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::TournamentFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Replay a recorded match
    Replay {
        /// Recording file
        #[arg(required = true)]
        recording: PathBuf,

        /// Stop after this many actions (default: the end)
        #[arg(short, long)]
        step: Option<usize>,

        /// Print every action on the way
        #[arg(short, long)]
        every: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Resolve one regiment clash
    Clash {
        /// Attacker as MEN[,SKILL[,ARMOR[,MANEUVER[,MORALE[,READINESS]]]]]
        #[arg(short, long, value_parser = cli::clash::parse_regiment)]
        attacker: RegimentStats,

        /// Defender, same format
        #[arg(short, long, value_parser = cli::clash::parse_regiment)]
        defender: RegimentStats,

        /// Roll dice instead of using expectations
        #[arg(short, long)]
        randomize: bool,

        /// Seed for randomized clashes (default: random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Engine configuration JSON for the clash constants
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Print the default engine configuration
    Config,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let result = match args.command {
        Commands::Run {
            seed,
            config,
            format,
            save,
            quiet,
        } => cli::run::execute(seed, config.as_deref(), format, save.as_deref(), quiet),

        Commands::Tournament {
            games,
            seed,
            threads,
            config,
            format,
            progress,
        } => cli::tournament::execute(games, seed, threads, config.as_deref(), format, progress),

        Commands::Replay {
            recording,
            step,
            every,
            format,
        } => cli::replay::execute(&recording, step, every, format),

        Commands::Clash {
            attacker,
            defender,
            randomize,
            seed,
            config,
            format,
        } => cli::clash::execute(
            &attacker,
            &defender,
            randomize,
            seed,
            config.as_deref(),
            format,
        ),

        Commands::Config => cli::print_default_config(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
