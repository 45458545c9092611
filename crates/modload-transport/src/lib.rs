//! modload Transport Layer
//!
//! A transport turns a location into "the code at this location has run and
//! registered its modules". This crate provides:
//!
//! - [`Transport`]: the contract the loader consumes
//! - [`Dispatcher`]: path-rewrite rules plus per-location dedup in front of a transport
//! - [`memory`]: in-process bundles, used for embedding and tests
//! - [`fs`]: JSON module descriptors read from disk
//! - [`http`]: JSON module descriptors fetched over HTTP
//!
//! # Example
//!
//! ```ignore
//! use modload_transport::{Dispatcher, MemoryTransport};
//!
//! let transport = MemoryTransport::new();
//! transport.insert("/static/app", |sink| sink.define("app", app_definition()));
//!
//! let dispatcher = Dispatcher::new(Arc::new(transport));
//! dispatcher.add_rule(|req| req.charset = Some("utf-8".into()));
//! ```

pub mod descriptor;
pub mod dispatcher;
pub mod fs;
pub mod http;
pub mod memory;
pub mod rules;

use std::sync::Arc;

use anyhow::Result;
use modload_types::ModuleSink;
use serde::Serialize;

pub use descriptor::{parse_descriptors, register_descriptors, ModuleDescriptor};
pub use dispatcher::Dispatcher;
pub use fs::FsTransport;
pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use rules::{PathRule, PathRules};

/// One fetch, after path rules have been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    /// Where to fetch from.
    pub location: String,
    /// Media type hint for the fetched code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Character set hint for the fetched code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
}

impl FetchRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            content_type: None,
            charset: None,
        }
    }
}

/// Fetch contract consumed by the loader.
///
/// `fetch` resolves once the code at `request.location` has executed and made
/// its `define` calls through `sink`. An `Err` means the code never ran.
/// Deduplication of identical in-flight locations is the caller's job (see
/// [`Dispatcher`]).
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest, sink: Arc<dyn ModuleSink>) -> Result<()>;
}

