//! What fetched code registers, and what it gets handed when it runs.
//!
//! A [`Definition`] is the module's defining function. It runs at most once,
//! receiving a [`ModuleContext`] that exposes a scoped `require`, the
//! module's own [`Exports`], and the module's identity. Returning
//! `Ok(Some(value))` replaces the exports wholesale; returning `Ok(None)`, or
//! a falsy value such as `false` or `0`, keeps whatever was written into the
//! exports in place.

use serde::Serialize;
use serde_json::Value;

use crate::error::LoadError;
use crate::exports::Exports;

/// A module's defining function.
pub type Definition =
    Box<dyn FnOnce(&ModuleContext<'_>) -> anyhow::Result<Option<Value>> + Send + 'static>;

/// Continuation for a fan-in over several modules: exports in request order,
/// or the first error.
pub type JoinContinuation = Box<dyn FnOnce(Result<Vec<Exports>, LoadError>) + Send + 'static>;

/// Box a closure as a [`Definition`].
///
/// ```
/// use modload_types::definition;
/// use serde_json::json;
///
/// let def = definition(|ctx| {
///     ctx.exports().insert("name", json!(ctx.identifier()));
///     Ok(None)
/// });
/// # drop(def);
/// ```
pub fn definition<F>(f: F) -> Definition
where
    F: FnOnce(&ModuleContext<'_>) -> anyhow::Result<Option<Value>> + Send + 'static,
{
    Box::new(f)
}

/// Identity of a module record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub identifier: String,
    pub location: String,
}

/// Registration entry point exposed to fetched code.
///
/// Transports hand one of these to the code they fetch; calling
/// [`define`](ModuleSink::define) may happen before or after anyone asked for
/// the identifier.
pub trait ModuleSink: Send + Sync {
    fn define(&self, identifier: &str, definition: Definition);
}

/// Synchronous and asynchronous dependency access from inside a defining
/// function.
pub trait Requirer: Send + Sync {
    /// Initialize (if needed) and return an already-loaded module's exports.
    fn require(&self, identifier: &str) -> Result<Exports, LoadError>;

    /// Load `identifiers` and invoke `continuation` once all are ready.
    fn use_modules(&self, identifiers: Vec<String>, continuation: JoinContinuation);
}

/// Arguments a defining function is invoked with.
pub struct ModuleContext<'a> {
    requirer: &'a dyn Requirer,
    exports: &'a Exports,
    module: &'a ModuleInfo,
}

impl<'a> ModuleContext<'a> {
    pub fn new(requirer: &'a dyn Requirer, exports: &'a Exports, module: &'a ModuleInfo) -> Self {
        Self {
            requirer,
            exports,
            module,
        }
    }

    /// Scoped `require`. Asking for the module currently being initialized
    /// (directly or through a cycle) yields its exports as they stand.
    pub fn require(&self, identifier: &str) -> Result<Exports, LoadError> {
        self.requirer.require(identifier)
    }

    /// Asynchronous `require`: load `identifiers` and continue later.
    pub fn use_modules<I, S, F>(&self, identifiers: I, continuation: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(Result<Vec<Exports>, LoadError>) + Send + 'static,
    {
        let identifiers = identifiers.into_iter().map(Into::into).collect();
        self.requirer
            .use_modules(identifiers, Box::new(continuation));
    }

    /// This module's exports cell.
    pub fn exports(&self) -> &Exports {
        self.exports
    }

    pub fn module(&self) -> &ModuleInfo {
        self.module
    }

    pub fn identifier(&self) -> &str {
        &self.module.identifier
    }

    pub fn location(&self) -> &str {
        &self.module.location
    }
}
