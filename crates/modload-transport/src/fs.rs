//! Filesystem transport.
//!
//! Locations are paths to JSON module descriptors (see [`descriptor`]).
//! A `file://` prefix is accepted, relative paths are taken against the
//! configured root (or the working directory), and a location without an
//! extension gets `.json` appended.
//!
//! [`descriptor`]: crate::descriptor

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use modload_types::ModuleSink;
use tracing::debug;

use crate::descriptor::{parse_descriptors, register_descriptors};
use crate::{FetchRequest, Transport};

const DESCRIPTOR_EXTENSION: &str = "json";

#[derive(Debug, Clone, Default)]
pub struct FsTransport {
    root: Option<PathBuf>,
}

impl FsTransport {
    /// Resolve relative locations against the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative locations against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// File a location maps to.
    pub fn path_for(&self, location: &str) -> PathBuf {
        let raw = location.strip_prefix("file://").unwrap_or(location);
        let mut path = PathBuf::from(raw);
        if path.extension().is_none() {
            path.set_extension(DESCRIPTOR_EXTENSION);
        }
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

#[async_trait::async_trait]
impl Transport for FsTransport {
    async fn fetch(&self, request: &FetchRequest, sink: Arc<dyn ModuleSink>) -> Result<()> {
        let path = self.path_for(&request.location);
        debug!(location = %request.location, path = %path.display(), "reading module descriptor");

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let descriptors =
            parse_descriptors(&bytes).with_context(|| format!("in {}", path.display()))?;

        register_descriptors(descriptors, sink.as_ref());
        Ok(())
    }
}
