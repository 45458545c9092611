//! In-process transport.
//!
//! Each location maps to a bundle: a closure that plays the part of fetched
//! code by calling `define` on the sink it is given. Bundles may carry an
//! artificial latency (to control arrival order) or a canned failure. Every
//! fetch is counted per location so callers can verify dedup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use modload_types::ModuleSink;
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::{FetchRequest, Transport};

pub type Bundle = Arc<dyn Fn(&dyn ModuleSink) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    bundle: Bundle,
    latency: Option<Duration>,
    failure: Option<String>,
}

#[derive(Default)]
pub struct MemoryTransport {
    bundles: RwLock<HashMap<String, Entry>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bundle` at `location`, completing on the next scheduler tick.
    pub fn insert<F>(&self, location: impl Into<String>, bundle: F)
    where
        F: Fn(&dyn ModuleSink) + Send + Sync + 'static,
    {
        self.insert_entry(location.into(), Arc::new(bundle), None, None);
    }

    /// Serve `bundle` at `location` after `latency`.
    pub fn insert_delayed<F>(&self, location: impl Into<String>, latency: Duration, bundle: F)
    where
        F: Fn(&dyn ModuleSink) + Send + Sync + 'static,
    {
        self.insert_entry(location.into(), Arc::new(bundle), Some(latency), None);
    }

    /// Fail every fetch of `location` with `message`.
    pub fn insert_failing(&self, location: impl Into<String>, message: impl Into<String>) {
        self.insert_entry(
            location.into(),
            Arc::new(|_: &dyn ModuleSink| {}),
            None,
            Some(message.into()),
        );
    }

    fn insert_entry(
        &self,
        location: String,
        bundle: Bundle,
        latency: Option<Duration>,
        failure: Option<String>,
    ) {
        self.bundles.write().insert(
            location,
            Entry {
                bundle,
                latency,
                failure,
            },
        );
    }

    /// How many times `location` was fetched.
    pub fn fetch_count(&self, location: &str) -> usize {
        self.fetches.lock().get(location).copied().unwrap_or(0)
    }

    /// Total fetches across all locations.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, request: &FetchRequest, sink: Arc<dyn ModuleSink>) -> Result<()> {
        *self
            .fetches
            .lock()
            .entry(request.location.clone())
            .or_default() += 1;

        let entry = self
            .bundles
            .read()
            .get(&request.location)
            .cloned()
            .ok_or_else(|| anyhow!("no bundle registered at {}", request.location))?;

        match entry.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        if let Some(message) = entry.failure {
            bail!("{}", message);
        }

        trace!(location = %request.location, "executing in-memory bundle");
        (entry.bundle)(sink.as_ref());
        Ok(())
    }
}
