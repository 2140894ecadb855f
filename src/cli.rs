use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use h2h_lib::EntityKind;

#[derive(Debug, Parser)]
#[command(
    name = "h2h",
    version,
    about = "Head-to-head comparison of F1 drivers and constructors"
)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log progress and effective settings to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare two drivers or two constructors and score them 0-100
    Compare {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Id of the first entity
        #[arg(long)]
        entity1: String,
        /// Id of the second entity
        #[arg(long)]
        entity2: String,
        /// `career` or seasons such as 2021,2023-2024
        #[arg(long, default_value = "career")]
        scope1: String,
        #[arg(long, default_value = "career")]
        scope2: String,
        /// Metrics to score (comma-separated); defaults to the config's list
        #[arg(long, value_delimiter = ',')]
        metrics: Option<Vec<String>>,
        /// Stats API base URL; overrides the config file
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show one entity's statistics for a scope
    Stats {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        entity: String,
        #[arg(long, default_value = "career")]
        scope: String,
        #[arg(long)]
        api_url: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the comparable metrics
    Metrics {
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Driver,
    Constructor,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Driver => EntityKind::Driver,
            KindArg::Constructor => EntityKind::Constructor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
