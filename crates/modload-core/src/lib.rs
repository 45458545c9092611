//! modload Core
//!
//! The module registry and the define / require / use protocol on top of it.
//!
//! - [`Loader`]: one independent registry plus the operations callers use
//! - [`FanIn`]: waits for N modules and continues once with all of them
//! - [`ModuleState`]: lifecycle of a single module record
//! - [`LoaderStats`]: counters for diagnostics
//!
//! Fetching is delegated to a [`modload_transport::Transport`]; identifier to
//! location mapping to a [`modload_resolver::Resolver`].

pub mod join;
pub mod loader;
pub mod module;
mod registry;

pub use join::FanIn;
pub use loader::{Loader, LoaderBuilder};
pub use module::{ModuleState, ReadyContinuation};
pub use registry::LoaderStats;

pub use modload_types::{
    definition, Definition, Exports, JoinContinuation, LoadError, LoaderConfig, ModuleContext,
    ModuleInfo, ModuleSink, Requirer,
};
