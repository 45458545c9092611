//! HTTP transport.
//!
//! Fetches JSON module descriptors with a blocking `ureq` agent on tokio's
//! blocking pool.
//!
//! Configuration via environment variables:
//!
//! - `MODLOAD_HTTP_TIMEOUT_SECS` - request timeout (default: 30)
//! - `MODLOAD_HTTP_CONNECT_TIMEOUT_SECS` - connect timeout (default: 10)

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use modload_types::env_utils::env_var_or;
use modload_types::ModuleSink;
use tracing::debug;

use crate::descriptor::{parse_descriptors, register_descriptors};
use crate::{FetchRequest, Transport};

#[derive(Clone, Debug)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Create a transport with timeouts taken from the environment.
    pub fn new() -> Self {
        let timeout = env_var_or("MODLOAD_HTTP_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS);
        let connect = env_var_or(
            "MODLOAD_HTTP_CONNECT_TIMEOUT_SECS",
            Self::DEFAULT_CONNECT_TIMEOUT_SECS,
        );
        Self::with_timeouts(Duration::from_secs(timeout), Duration::from_secs(connect))
    }

    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .timeout_connect(connect_timeout)
                .build(),
        }
    }

    /// Whether a location is something this transport can fetch.
    pub fn supports(location: &str) -> bool {
        let lower = location.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    fn get_blocking(agent: &ureq::Agent, request: &FetchRequest) -> Result<Vec<u8>> {
        let mut call = agent.get(&request.location);
        if let Some(content_type) = &request.content_type {
            call = call.set("Accept", content_type);
        }
        if let Some(charset) = &request.charset {
            call = call.set("Accept-Charset", charset);
        }

        let response = call
            .call()
            .map_err(|e| anyhow!("GET {} failed: {}", request.location, e))?;
        let mut body = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut body)
            .with_context(|| format!("failed to read body of {}", request.location))?;
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &FetchRequest, sink: Arc<dyn ModuleSink>) -> Result<()> {
        if !Self::supports(&request.location) {
            return Err(anyhow!(
                "http transport cannot fetch non-http location {}",
                request.location
            ));
        }
        debug!(location = %request.location, "fetching module descriptor over http");

        let agent = self.agent.clone();
        let owned = request.clone();
        let body = tokio::task::spawn_blocking(move || Self::get_blocking(&agent, &owned))
            .await
            .context("http fetch task failed")??;

        let descriptors = parse_descriptors(&body)
            .with_context(|| format!("in response from {}", request.location))?;
        register_descriptors(descriptors, sink.as_ref());
        Ok(())
    }
}
