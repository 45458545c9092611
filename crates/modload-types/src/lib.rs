//! Shared types for the modload workspace.
//!
//! This crate provides the vocabulary every other crate in the workspace speaks,
//! breaking what would otherwise be a circular dependency between the loader and
//! its transports:
//!
//! - [`Exports`]: the shared, swap-once cell holding a module's exported value
//! - [`LoadError`]: the loader's error taxonomy
//! - [`Definition`] / [`ModuleContext`]: what fetched code registers and what it
//!   receives when it runs
//! - [`ModuleSink`] / [`Requirer`]: the seams transports and defining functions
//!   call back into
//! - [`LoaderConfig`]: loader configuration (base url, debug, load timeout)

pub mod config;
pub mod env_utils;
pub mod error;
pub mod exports;
pub mod module;

pub use config::LoaderConfig;
pub use error::LoadError;
pub use exports::Exports;
pub use module::{
    definition, Definition, JoinContinuation, ModuleContext, ModuleInfo, ModuleSink, Requirer,
};
