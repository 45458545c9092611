//! Command implementations for the `modload` binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use modload_core::{Loader, LoaderConfig};
use modload_resolver::Resolver;
use modload_transport::{FsTransport, HttpTransport, Transport};

use crate::args::{ConfigArgs, LoadArgs, ResolveArgs};

/// Layer configuration: environment, then `--config`, then explicit flags.
pub fn resolve_config(args: &ConfigArgs, timeout_ms: Option<u64>, verbose: bool) -> Result<LoaderConfig> {
    let mut config = LoaderConfig::from_env();
    if let Some(path) = &args.config {
        config = config.merge(LoaderConfig::from_json_file(path)?);
    }

    let mut flags = LoaderConfig::new().with_debug(verbose);
    if let Some(base_url) = &args.base_url {
        flags = flags.with_base_url(base_url.clone());
    }
    if let Some(ms) = timeout_ms {
        flags = flags.with_load_timeout(Duration::from_millis(ms));
    }
    Ok(config.merge(flags))
}

/// HTTP for `http(s)` base urls, the filesystem otherwise.
pub fn transport_for(config: &LoaderConfig) -> Arc<dyn Transport> {
    match config.base_url.as_deref() {
        Some(base) if HttpTransport::supports(base) => {
            debug!(base, "using http transport");
            Arc::new(HttpTransport::new())
        }
        _ => Arc::new(FsTransport::new()),
    }
}

async fn load(args: &LoadArgs, verbose: bool) -> Result<Loader> {
    let config = resolve_config(&args.config, args.timeout_ms, verbose)?;
    let loader = Loader::new(config.clone(), transport_for(&config));
    loader
        .load(args.ids.iter().cloned())
        .await
        .with_context(|| format!("failed to load {}", args.ids.join(", ")))?;
    Ok(loader)
}

/// `modload use`: exports of every requested module, in request order.
pub async fn use_modules(args: &LoadArgs, verbose: bool) -> Result<Value> {
    let loader = load(args, verbose).await?;
    let exports = args
        .ids
        .iter()
        .map(|id| loader.exports(id).map(|e| e.snapshot()).unwrap_or(Value::Null))
        .collect();
    Ok(Value::Array(exports))
}

/// `modload stats`: loader counters after loading.
pub async fn stats(args: &LoadArgs, verbose: bool) -> Result<Value> {
    let loader = load(args, verbose).await?;
    Ok(serde_json::to_value(loader.stats())?)
}

/// `modload resolve`: location per identifier.
pub fn resolve(args: &ResolveArgs) -> Result<Vec<String>> {
    let config = resolve_config(&args.config, None, false)?;
    let resolver = Resolver::new(config.base_url.as_deref());
    Ok(args.ids.iter().map(|id| resolver.resolve(id)).collect())
}
