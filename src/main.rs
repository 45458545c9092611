//! modload: load modules from JSON descriptors and print their exports.
//!
//! ```bash
//! # Load two modules from a directory of descriptors
//! modload use app util --base-url ./modules
//!
//! # Where would these identifiers be fetched from?
//! modload resolve app https://cdn.example.com/lib/x --base-url /static
//!
//! # Counters after loading, with a per-fetch timeout
//! modload stats app --base-url https://cdn.example.com/lib --timeout-ms 5000
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`; `--verbose` or `MODLOAD_DEBUG=1`
//! defaults it to `debug`.

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use modload::args::{Cli, Commands};
use modload::commands;
use modload::LoaderConfig;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { command, verbose } = Cli::parse();
    init_tracing(verbose || LoaderConfig::from_env().debug);
    debug!(command = command.name(), version = modload::Loader::VERSION, "starting");

    match command {
        Commands::Use(args) => {
            let exports = commands::use_modules(&args, verbose).await?;
            println!("{}", serde_json::to_string_pretty(&exports)?);
        }
        Commands::Stats(args) => {
            let stats = commands::stats(&args, verbose).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Resolve(args) => {
            for location in commands::resolve(&args)? {
                println!("{}", location);
            }
        }
    }
    Ok(())
}
