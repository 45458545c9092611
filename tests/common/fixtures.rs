//! Fixture utilities for tests.
//!
//! Provides standardized loader setups over an in-memory transport and
//! on-disk descriptor directories for the filesystem transport and CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use modload::{definition, Loader, LoaderConfig, MemoryTransport, ModuleSink};
use serde_json::Value;
use tempfile::TempDir;

/// Base url used by memory-backed loaders.
pub const BASE_URL: &str = "/static";

/// Loader over a fresh in-memory transport, with `BASE_URL` configured.
///
/// The transport handle is returned so tests can register bundles and
/// inspect fetch counts.
#[allow(dead_code)]
pub fn memory_loader() -> (Loader, Arc<MemoryTransport>) {
    memory_loader_with(LoaderConfig::new())
}

/// Like [`memory_loader`], overlaying `config` on top of the base url.
#[allow(dead_code)]
pub fn memory_loader_with(config: LoaderConfig) -> (Loader, Arc<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new());
    let config = LoaderConfig::new().with_base_url(BASE_URL).merge(config);
    let loader = Loader::new(config, transport.clone());
    (loader, transport)
}

/// Serve a bundle at `<BASE_URL>/<id>` defining `id` with constant exports.
#[allow(dead_code)]
pub fn constant_bundle(transport: &MemoryTransport, id: &'static str, exports: Value) {
    transport.insert(format!("{}/{}", BASE_URL, id), move |sink: &dyn ModuleSink| {
        let exports = exports.clone();
        sink.define(id, definition(move |_| Ok(Some(exports))));
    });
}

/// Write `contents` to `<dir>/<name>`, creating parent directories.
#[allow(dead_code)]
pub fn write_descriptor(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create descriptor directory");
    }
    std::fs::write(&path, contents).expect("write descriptor");
    path
}

/// Directory with a small set of descriptors:
///
/// - `app.json`: bundle defining `lib/math` and `app` (which imports it)
/// - `lib/strings.json`: single module
/// - `empty.json`: valid document that defines some other module
/// - `broken.json`: not JSON
#[allow(dead_code)]
pub fn descriptor_dir() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    write_descriptor(
        dir.path(),
        "app.json",
        r#"{
            "modules": [
                { "id": "lib/math", "exports": { "pi": 3.14159 } },
                { "id": "app", "imports": { "math": "lib/math" }, "exports": { "name": "demo" } }
            ]
        }"#,
    );
    write_descriptor(
        dir.path(),
        "lib/strings.json",
        r#"{ "id": "lib/strings", "exports": { "upper": true } }"#,
    );
    write_descriptor(dir.path(), "empty.json", r#"{ "id": "somebody-else" }"#);
    write_descriptor(dir.path(), "broken.json", "{ this is not json");
    dir
}
