use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "MD-SAPT CLI - Pairwise SAPT energy decomposition over molecular-dynamics trajectories and docking ensembles.",
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
    /// Run a SAPT analysis described by a configuration file.
    Run(RunArgs),
    /// Write a commented template configuration file.
    Generate(GenerateArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the analysis configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path for the CSV results table, overriding `output` from the config file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Override the number of CPUs given to each Psi4 calculation.
    #[arg(short, long, value_name = "NUM")]
    pub ncpus: Option<usize>,

    /// Override the memory ceiling of each Psi4 calculation (e.g. '4GB').
    #[arg(short, long, value_name = "SIZE")]
    pub memory: Option<String>,

    /// Override the Psi4 executable.
    #[arg(long, value_name = "PATH")]
    pub psi4: Option<PathBuf>,

    /// What to do when a pair fails: 'abort' or 'record-missing'.
    #[arg(long, value_name = "POLICY")]
    pub on_failure: Option<String>,

    /// Keep the Psi4 output of every pair evaluation.
    #[arg(long)]
    pub save_output: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S psi4.basis=jun-cc-pvdz
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Frames of a molecular-dynamics trajectory.
    Trajectory,
    /// Poses of a docking ensemble.
    Docking,
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Kind of analysis the template describes.
    #[arg(value_enum)]
    pub kind: TemplateKind,

    /// Where to write the template.
    #[arg(short, long, default_value = "config.toml", value_name = "PATH")]
    pub output: PathBuf,

    /// Overwrite the output file if it already exists.
    #[arg(long)]
    pub force: bool,
}
