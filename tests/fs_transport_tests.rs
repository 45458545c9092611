//! Loading JSON module descriptors from disk.

mod common;

use std::sync::Arc;

use common::{assert_err, assert_error_contains, assert_exports_eq, assert_ok, descriptor_dir};
use modload::{FsTransport, LoadError, Loader, LoaderConfig, ModuleState};
use serde_json::json;
use tempfile::TempDir;

fn fs_loader(dir: &TempDir) -> Loader {
    let base = dir.path().to_string_lossy().into_owned();
    Loader::new(
        LoaderConfig::new().with_base_url(base),
        Arc::new(FsTransport::new()),
    )
}

#[tokio::test]
async fn test_bundle_binds_imports_and_serves_extras() {
    let dir = descriptor_dir();
    let loader = fs_loader(&dir);

    let app = assert_ok(loader.load_one("app").await, "load app");
    assert_exports_eq(
        &app,
        &json!({ "name": "demo", "math": { "pi": 3.14159 } }),
        "app exports",
    );

    // Defined by app.json, never fetched from lib/math.json.
    let math = assert_ok(loader.load_one("lib/math").await, "load lib/math");
    assert_eq!(math.get("pi"), Some(json!(3.14159)));
    assert_eq!(loader.stats().fetches_dispatched, 1);
}

#[tokio::test]
async fn test_nested_single_module_descriptor() {
    let dir = descriptor_dir();
    let loader = fs_loader(&dir);

    let strings = assert_ok(loader.load_one("lib/strings").await, "load lib/strings");

    assert_eq!(strings.get("upper"), Some(json!(true)));
    assert_eq!(
        loader.resolve("lib/strings"),
        format!("{}/lib/strings", dir.path().display())
    );
}

#[tokio::test]
async fn test_descriptor_for_another_module_is_not_defined() {
    let dir = descriptor_dir();
    let loader = fs_loader(&dir);

    let err = assert_err(loader.load_one("empty").await, "load empty");

    assert!(matches!(err, LoadError::NotDefined { .. }), "{err:?}");
    assert_error_contains(&err, "never defined module empty", "not defined message");
    assert_eq!(loader.state("somebody-else"), Some(ModuleState::Declared));
}

#[tokio::test]
async fn test_invalid_json_is_a_transport_error() {
    let dir = descriptor_dir();
    let loader = fs_loader(&dir);

    let err = assert_err(loader.load_one("broken").await, "load broken");

    assert!(matches!(err, LoadError::Transport { .. }), "{err:?}");
    assert_error_contains(&err, "invalid module descriptor document", "parse failure");
}

#[tokio::test]
async fn test_missing_file_is_a_transport_error() {
    let dir = descriptor_dir();
    let loader = fs_loader(&dir);

    let err = assert_err(loader.load_one("nowhere").await, "load nowhere");

    assert_error_contains(&err, "failed to read", "missing file");
    assert_eq!(err.identifier(), Some("nowhere"));
}

#[tokio::test]
async fn test_path_rule_redirects_to_real_directory() {
    let dir = descriptor_dir();
    let real = dir.path().to_string_lossy().into_owned();
    let loader = Loader::new(
        LoaderConfig::new().with_base_url("/virtual/modules"),
        Arc::new(FsTransport::new()),
    );
    loader.add_path_rule(move |request| {
        if let Some(rest) = request.location.strip_prefix("/virtual/modules") {
            request.location = format!("{}{}", real, rest);
        }
    });

    let strings = assert_ok(loader.load_one("lib/strings").await, "load via rule");

    assert_eq!(strings.get("upper"), Some(json!(true)));
    assert_eq!(loader.resolve("lib/strings"), "/virtual/modules/lib/strings");
}

#[tokio::test]
async fn test_root_relative_locations() {
    let dir = descriptor_dir();
    let loader = Loader::new(
        LoaderConfig::new(),
        Arc::new(FsTransport::with_root(dir.path())),
    );

    let app = assert_ok(loader.load_one("app").await, "load relative app");
    assert_eq!(app.get("name"), Some(json!("demo")));
}
