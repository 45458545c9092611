//! modload
//!
//! Asynchronous module loading with exactly-once initialization:
//!
//! - **Registry**: one record per identifier, created on first reference
//! - **Protocol**: `define` / `require` / `use` with a fan-in join that
//!   continues once every requested module is ready, in request order
//! - **Cycles**: a module required while it is initializing yields its
//!   partial exports instead of running twice
//! - **Transports**: in-memory bundles, JSON descriptors on disk or over HTTP
//!
//! See [`modload_core::Loader`] for the entry point.

pub mod args;
pub mod commands;

pub use modload_core::{
    definition, Definition, Exports, FanIn, LoadError, Loader, LoaderBuilder, LoaderConfig,
    LoaderStats, ModuleContext, ModuleInfo, ModuleSink, ModuleState, Requirer,
};
pub use modload_resolver::Resolver;
pub use modload_transport::{
    FetchRequest, FsTransport, HttpTransport, MemoryTransport, ModuleDescriptor, Transport,
};
