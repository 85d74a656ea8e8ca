use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "polyns - nested sampling over periodic cells of hard-sphere polymer chains.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a fresh nested sampling run.
    Run(RunArgs),
    /// Resume an interrupted run from its restart checkpoint.
    Resume(ResumeArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory for all run outputs (trajectory, eviction log, checkpoint).
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub output_dir: PathBuf,

    // --- Configuration Overrides ---
    /// Override the number of walkers.
    #[arg(short = 'n', long, value_name = "INT")]
    pub walkers: Option<usize>,

    /// Override the number of chains per cell.
    #[arg(long, value_name = "INT")]
    pub chains: Option<usize>,

    /// Override the number of beads per chain.
    #[arg(long, value_name = "INT")]
    pub beads: Option<usize>,

    /// Override the number of sweeps per constrained walk.
    #[arg(long, value_name = "INT")]
    pub sweeps: Option<usize>,

    /// Override the total number of iterations.
    #[arg(short = 'i', long, value_name = "INT")]
    pub iterations: Option<u64>,

    /// Override the RNG seed.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Override the wall-clock budget, in seconds.
    #[arg(long, value_name = "SECS")]
    pub time_budget: Option<u64>,
}

/// Arguments for the `resume` subcommand.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Path to the run configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory holding the run outputs, including the checkpoint to resume.
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub output_dir: PathBuf,

    /// Override the total number of iterations to run to.
    #[arg(short = 'i', long, value_name = "INT")]
    pub iterations: Option<u64>,

    /// Override the wall-clock budget, in seconds.
    #[arg(long, value_name = "SECS")]
    pub time_budget: Option<u64>,
}
