use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fabfruit_core::Phase;
use fabfruit_experiment::config::DEFAULT_BOX_COUNT;
use tracing_subscriber::EnvFilter;

mod app;
mod autopilot;

/// Fabulous fruits: timing generation, participant boxes and dry runs.
#[derive(Parser)]
#[command(name = "fabfruit", version, long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search seeds for balanced timelines of one phase and save them
    Timing {
        #[arg(short, long, default_value = "SOA")]
        phase: Phase,
        /// JSON settings for the phase instead of the defaults
        #[arg(long)]
        settings: Option<PathBuf>,
        #[arg(short, long, default_value_t = DEFAULT_BOX_COUNT)]
        boxes: usize,
        /// First seed tried
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// How many balanced timelines to keep
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Give up after this many seeds
        #[arg(long, default_value_t = 10_000)]
        max_seeds: u64,
        #[arg(short, long, default_value = "timing")]
        out: PathBuf,
    },

    /// Create or resume a participant's boxes
    Boxes {
        #[command(flatten)]
        participant: app::Participant,
    },

    /// Summarise timing files: devalued boxes and side balance per block
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Pick a participant's scanner runs from a pool of timing files
    Runs {
        /// Directory of frozen timing files
        pool: PathBuf,
        #[arg(long)]
        seed: u64,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long)]
        end: usize,
    },

    /// Run a session without a screen, answering automatically
    Simulate {
        #[command(flatten)]
        participant: app::Participant,
        /// Chance of pressing the correct key
        #[arg(long, default_value_t = 0.8)]
        accuracy: f64,
        /// Results CSV, defaults to the participant directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .without_time()
        .init();

    match cli.command {
        Command::Timing {
            phase,
            settings,
            boxes,
            seed,
            count,
            max_seeds,
            out,
        } => app::timing(phase, settings.as_deref(), boxes, app::seed_range(seed, max_seeds), count, &out),
        Command::Boxes { participant } => app::boxes(&participant).map(|_| ()),
        Command::Check { files } => app::check(&files),
        Command::Runs { pool, seed, start, end } => app::runs(&pool, seed, start..end),
        Command::Simulate {
            participant,
            accuracy,
            out,
        } => app::simulate(&participant, accuracy, out),
    }
}
