//! Command line argument parsing for the parley CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Parley - a portfolio chatbot intent classifier
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(about = "Train, query and teach the portfolio intent classifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ParleyArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ParleyArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Where the service reads its data and keeps its state.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Intent dataset (JSON)
    #[arg(
        short,
        long,
        value_name = "DATASET_FILE",
        env = "PARLEY_DATASET",
        default_value = "data/portfolio_intents.json",
        global = true
    )]
    pub dataset: PathBuf,

    /// Directory holding the saved model and learned examples
    #[arg(
        short,
        long,
        value_name = "STORE_DIR",
        env = "PARLEY_STORE",
        default_value = ".parley",
        global = true
    )]
    pub store: PathBuf,

    /// Configuration file (JSON); defaults apply when omitted
    #[arg(short, long, value_name = "CONFIG_FILE", env = "PARLEY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Seed for response selection
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a new model and save it
    Train(TrainArgs),

    /// Classify one or more inputs
    Classify(ClassifyArgs),

    /// Teach the classifier a new answer
    Learn(LearnArgs),

    /// Answer from the fallback rules only
    Fallback(FallbackArgs),

    /// Show model and runtime statistics
    Stats,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Retrain even if a saved model loads
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// Inputs to classify
    #[arg(value_name = "TEXT", required = true)]
    pub inputs: Vec<String>,

    /// Override the confidence threshold
    #[arg(long)]
    pub confidence_threshold: Option<f32>,

    /// Override the relevance threshold
    #[arg(long)]
    pub relevance_threshold: Option<f32>,

    /// Try the fallback rules when the model defers
    #[arg(long)]
    pub with_fallback: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LearnArgs {
    /// The user's question
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// The answer to learn for it
    #[arg(value_name = "RESPONSE")]
    pub response: String,
}

#[derive(Args, Debug, Clone)]
pub struct FallbackArgs {
    #[arg(value_name = "TEXT")]
    pub text: String,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
