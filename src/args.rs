use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "modload",
    author,
    version,
    about = "Load modules and their dependencies from JSON descriptors",
    long_about = "Resolves module identifiers against a base url, fetches each location once, \
                  initializes modules in dependency order and prints their exports."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (log every module state transition)
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load modules and print their exports as a JSON array, in request order
    Use(LoadArgs),

    /// Print the location each identifier resolves to, one per line
    Resolve(ResolveArgs),

    /// Load modules and print loader counters as JSON
    Stats(LoadArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Use(_) => "use",
            Commands::Resolve(_) => "resolve",
            Commands::Stats(_) => "stats",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Location prefix: a directory of descriptors or an http(s) url
    #[arg(long, value_name = "DIR_OR_URL")]
    pub base_url: Option<String>,

    /// JSON loader config file; flags given on the command line win
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Module identifiers
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Fail a fetch that takes longer than this many milliseconds
    #[arg(long, value_name = "N")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Module identifiers
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}
