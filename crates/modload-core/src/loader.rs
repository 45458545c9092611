//! The loader protocol.
//!
//! [`Loader`] drives modules through their lifecycle:
//!
//! - [`define`](Loader::define): fetched code registers a defining function
//! - [`use_modules`](Loader::use_modules): callers ask for modules and continue
//!   once all of them are loaded and initialized
//! - [`require`](Loader::require): synchronous access from inside a defining function
//!
//! Fetch completion is the only suspension point. Everything else happens
//! synchronously inside whichever call triggered it. All registry mutations go
//! through one mutex, and user code (defining functions, continuations,
//! transports) always runs with that mutex released, so a defining function
//! may freely call back into the loader.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use modload_core::Loader;
//! use modload_transport::MemoryTransport;
//! use modload_types::{definition, LoaderConfig, ModuleSink};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), modload_types::LoadError> {
//! let transport = MemoryTransport::new();
//! transport.insert("/static/greeting", |sink: &dyn ModuleSink| {
//!     sink.define("greeting", definition(|_| Ok(Some(json!({ "text": "hello" })))));
//! });
//!
//! let loader = Loader::new(LoaderConfig::new().with_base_url("/static/"), Arc::new(transport));
//! let exports = loader.load(["greeting"]).await?;
//! assert_eq!(exports[0].get("text"), Some(json!("hello")));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use modload_resolver::Resolver;
use modload_transport::{Dispatcher, FetchRequest, Transport};
use modload_types::{
    Definition, Exports, JoinContinuation, LoadError, LoaderConfig, ModuleContext, ModuleInfo,
    ModuleSink, Requirer,
};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::join::FanIn;
use crate::module::{ModuleState, ReadyContinuation};
use crate::registry::{FetchOutcome, LoaderStats, Registry};

/// What `lazy_load` decided to do once the registry lock is released.
enum LazyStep {
    /// Code defined ahead is now loaded; initialize it if anyone is waiting.
    Promoted { waiting: bool },
    /// The module cannot load; answer its queued continuations with `error`.
    Settle(LoadError, Vec<ReadyContinuation>),
    /// Ask the transport for this location.
    Fetch(String),
    /// Nothing to do now; a fetch in flight (or nothing at all) will follow up.
    Wait,
}

struct LoaderInner {
    registry: Mutex<Registry>,
    dispatcher: Dispatcher,
    config: RwLock<LoaderConfig>,
    runtime: Option<Handle>,
}

/// Cheap-to-clone handle to one independent module registry.
#[derive(Clone)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

/// Builder for [`Loader`].
pub struct LoaderBuilder {
    transport: Arc<dyn Transport>,
    config: LoaderConfig,
    runtime: Option<Handle>,
}

impl LoaderBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: LoaderConfig::default(),
            runtime: None,
        }
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime that drives fetches. Defaults to the runtime current at
    /// `build` time, falling back to the one current at each dispatch.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Loader {
        let resolver = Resolver::new(self.config.base_url.as_deref());
        Loader {
            inner: Arc::new(LoaderInner {
                registry: Mutex::new(Registry::new(resolver)),
                dispatcher: Dispatcher::new(self.transport),
                config: RwLock::new(self.config),
                runtime: self.runtime.or_else(|| Handle::try_current().ok()),
            }),
        }
    }
}

impl Loader {
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    pub fn new(config: LoaderConfig, transport: Arc<dyn Transport>) -> Self {
        LoaderBuilder::new(transport).config(config).build()
    }

    pub fn builder(transport: Arc<dyn Transport>) -> LoaderBuilder {
        LoaderBuilder::new(transport)
    }

    // ==================== Configuration ====================

    /// Replace the configuration. The base url applies to modules first
    /// referenced after this call; existing records keep their location.
    pub fn configure(&self, config: LoaderConfig) {
        self.inner
            .registry
            .lock()
            .resolver
            .set_base_url(config.base_url.as_deref());
        *self.inner.config.write() = config;
    }

    pub fn config(&self) -> LoaderConfig {
        self.inner.config.read().clone()
    }

    /// Register a rewrite rule applied to every fetch request before dispatch.
    pub fn add_path_rule(&self, rule: impl Fn(&mut FetchRequest) + Send + Sync + 'static) {
        self.inner.dispatcher.add_rule(rule);
    }

    /// Location `identifier` resolves to under the current configuration.
    pub fn resolve(&self, identifier: &str) -> String {
        self.inner.registry.lock().resolver.resolve(identifier)
    }

    // ==================== Introspection ====================

    pub fn state(&self, identifier: &str) -> Option<ModuleState> {
        self.inner.registry.lock().get(identifier).map(|m| m.state)
    }

    /// Exports handle of a known module, in whatever state it is.
    pub fn exports(&self, identifier: &str) -> Option<Exports> {
        self.inner
            .registry
            .lock()
            .get(identifier)
            .map(|m| m.exports.clone())
    }

    pub fn stats(&self) -> LoaderStats {
        self.inner.registry.lock().stats()
    }

    // ==================== Protocol ====================

    /// Register `definition` as the defining function of `identifier`.
    ///
    /// If a caller is already waiting for the identifier the module becomes
    /// loaded right away; otherwise it is held until first requested.
    pub fn define(&self, identifier: &str, definition: Definition) {
        let promoted = self
            .inner
            .registry
            .lock()
            .register_definition(identifier, definition);

        match promoted {
            Some(waiting) => {
                self.log_transition(identifier, ModuleState::Loaded);
                if waiting {
                    let _ = self.initialize(identifier);
                }
            }
            None => trace!(identifier, "definition recorded; nobody waiting"),
        }
    }

    /// Synchronous lookup.
    ///
    /// Initializes the module if needed and returns its exports. A module
    /// that is in the middle of its own initialization (it required itself,
    /// directly or through a cycle) yields its exports as they currently
    /// stand instead of running again.
    pub fn require(&self, identifier: &str) -> Result<Exports, LoadError> {
        let (state, exports) = {
            let mut registry = self.inner.registry.lock();
            let module = registry.get_or_create(identifier);
            (module.state, module.exports.clone())
        };

        if state == ModuleState::Initializing {
            debug!(identifier, "re-entrant require; returning partial exports");
            return Ok(exports);
        }
        self.initialize(identifier)
    }

    /// Run the module's defining function if it has not run yet.
    ///
    /// Fails with [`LoadError::ModuleNotFound`] when no defining function was
    /// ever registered, and with the stored error for a failed module.
    ///
    /// Continuations queued on the module, before or during its
    /// initialization, are delivered afterwards in the order they were queued.
    pub fn initialize(&self, identifier: &str) -> Result<Exports, LoadError> {
        let (definition, exports, info) = {
            let mut registry = self.inner.registry.lock();
            let state = match registry.get(identifier) {
                Some(module) => match module.state {
                    ModuleState::Initializing | ModuleState::Initialized => {
                        return Ok(module.exports.clone())
                    }
                    ModuleState::Failed => return Err(module.failure()),
                    _ if module.definition.is_none() => {
                        return Err(LoadError::module_not_found(identifier))
                    }
                    state => state,
                },
                None => return Err(LoadError::module_not_found(identifier)),
            };

            // Code that arrived ahead of any request is loaded once it runs.
            if !state.is_loaded() {
                registry.become_loaded(identifier);
            }

            let Some(module) = registry.get_mut(identifier) else {
                return Err(LoadError::module_not_found(identifier));
            };
            let Some(definition) = module.definition.take() else {
                return Err(LoadError::module_not_found(identifier));
            };
            module.state = ModuleState::Initializing;
            (definition, module.exports.clone(), module.info.clone())
        };
        self.log_transition(identifier, ModuleState::Initializing);

        let result = definition(&ModuleContext::new(self, &exports, &info));

        let outcome = match result {
            Ok(replacement) => {
                exports.finalize(replacement);
                Ok(exports)
            }
            Err(err) => Err(LoadError::DefinitionFailed {
                identifier: identifier.to_string(),
                message: format!("{:#}", err),
            }),
        };

        let pending = {
            let mut registry = self.inner.registry.lock();
            match (registry.get_mut(identifier), &outcome) {
                (Some(module), Ok(_)) => {
                    module.state = ModuleState::Initialized;
                    std::mem::take(&mut module.pending)
                }
                (Some(module), Err(err)) => module.fail(err.clone()),
                (None, _) => Vec::new(),
            }
        };

        match &outcome {
            Ok(_) => self.log_transition(identifier, ModuleState::Initialized),
            Err(err) => warn!(identifier, error = %err, "module initialization failed"),
        }
        for continuation in pending {
            continuation(outcome.clone());
        }
        outcome
    }

    /// Invoke `continuation` once the module is loaded and initialized.
    ///
    /// Initialized and failed modules are answered on the spot. Anything
    /// else is queued on the module and delivered by whichever call finishes
    /// its initialization (or fails its fetch); a loaded module is
    /// initialized right away.
    pub fn ready(&self, identifier: &str, continuation: ReadyContinuation) {
        let outcome = {
            let mut registry = self.inner.registry.lock();
            let module = registry.get_or_create(identifier);
            match module.state {
                ModuleState::Initialized => Ok(module.exports.clone()),
                ModuleState::Failed => Err(module.failure()),
                state => {
                    module.pending.push(continuation);
                    if state == ModuleState::Loaded {
                        drop(registry);
                        let _ = self.initialize(identifier);
                    }
                    return;
                }
            }
        };
        continuation(outcome);
    }

    /// Decide how a requested module's code gets here.
    ///
    /// In order: code that was defined ahead is promoted to loaded; a module
    /// whose location already failed to fetch fails the same way; a module
    /// whose location already has a fetch in flight joins that fetch; a
    /// location whose code already arrived without defining the module
    /// answers its waiters with "not found"; anything else is fetched.
    pub fn lazy_load(&self, identifier: &str) {
        let step = {
            let mut registry = self.inner.registry.lock();
            let (state, location) = {
                let module = registry.get_or_create(identifier);
                (module.state, module.location().to_string())
            };

            if registry.declared_ahead.contains(identifier) {
                LazyStep::Promoted {
                    waiting: registry.become_loaded(identifier),
                }
            } else if state == ModuleState::Failed || state.is_loaded() {
                LazyStep::Wait
            } else if let Some((err, pending)) = registry.fail_from_location(identifier) {
                LazyStep::Settle(err, pending)
            } else if registry.loading_locations.contains(&location) {
                registry.requested.insert(identifier.to_string());
                registry.dedup_hits += 1;
                if let Some(module) = registry.get_mut(identifier) {
                    module.state = ModuleState::Loading;
                }
                trace!(identifier, location = %location, "joining fetch in flight");
                LazyStep::Wait
            } else if registry.loaded_locations.contains(&location) {
                let pending = registry
                    .get_mut(identifier)
                    .map(|m| std::mem::take(&mut m.pending))
                    .unwrap_or_default();
                LazyStep::Settle(LoadError::module_not_found(identifier), pending)
            } else {
                registry.requested.insert(identifier.to_string());
                registry.loading_locations.insert(location.clone());
                if let Some(module) = registry.get_mut(identifier) {
                    module.state = ModuleState::Loading;
                }
                LazyStep::Fetch(location)
            }
        };

        match step {
            LazyStep::Promoted { waiting } => {
                self.log_transition(identifier, ModuleState::Loaded);
                if waiting {
                    let _ = self.initialize(identifier);
                }
            }
            LazyStep::Settle(err, pending) => {
                if !pending.is_empty() {
                    warn!(identifier, error = %err, "module failed to load");
                }
                for continuation in pending {
                    continuation(Err(err.clone()));
                }
            }
            LazyStep::Fetch(location) => {
                self.log_transition(identifier, ModuleState::Loading);
                self.dispatch(identifier, location);
            }
            LazyStep::Wait => {}
        }
    }

    /// Load every identifier, then call `continuation` exactly once with
    /// their exports in request order, or with the first error.
    pub fn use_modules<I, S, F>(&self, identifiers: I, continuation: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(Result<Vec<Exports>, LoadError>) + Send + 'static,
    {
        let identifiers: Vec<String> = identifiers.into_iter().map(Into::into).collect();
        let join = FanIn::new(identifiers.len(), Box::new(continuation));

        for (index, identifier) in identifiers.iter().enumerate() {
            let slot = Arc::clone(&join);
            self.ready(
                identifier,
                Box::new(move |outcome: Result<Exports, LoadError>| match outcome {
                    Ok(exports) => slot.complete(index, exports),
                    Err(err) => slot.fail(err),
                }),
            );
            self.lazy_load(identifier);
        }
    }

    /// Single-module form of [`use_modules`](Loader::use_modules).
    pub fn use_module<F>(&self, identifier: &str, continuation: F)
    where
        F: FnOnce(Result<Exports, LoadError>) + Send + 'static,
    {
        let requested = identifier.to_string();
        self.use_modules([identifier], move |result: Result<Vec<Exports>, LoadError>| {
            continuation(result.and_then(|mut all| {
                all.pop()
                    .ok_or_else(|| LoadError::module_not_found(requested))
            }))
        });
    }

    /// Future form of [`use_modules`](Loader::use_modules).
    pub async fn load<I, S>(&self, identifiers: I) -> Result<Vec<Exports>, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (tx, rx) = oneshot::channel();
        self.use_modules(identifiers, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| LoadError::Shutdown)?
    }

    /// Future form of [`use_module`](Loader::use_module).
    pub async fn load_one(&self, identifier: &str) -> Result<Exports, LoadError> {
        let (tx, rx) = oneshot::channel();
        self.use_module(identifier, move |result| {
            let _ = tx.send(result);
        });
        rx.await.map_err(|_| LoadError::Shutdown)?
    }

    // ==================== Internals ====================

    fn dispatch(&self, identifier: &str, location: String) {
        let sink: Arc<dyn ModuleSink> = Arc::new(self.clone());
        let Some(fetch) = self.inner.dispatcher.dispatch(&location, sink) else {
            // The transport already ran this location and its code arrived;
            // failed locations are answered in `lazy_load` before this point.
            debug!(identifier, location = %location, "location fetched before; not refetching");
            self.complete_fetch(&location, FetchOutcome::Completed);
            return;
        };

        let Some(runtime) = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
        else {
            self.complete_fetch(
                &location,
                FetchOutcome::Failed("no tokio runtime available to drive the fetch".into()),
            );
            return;
        };

        self.inner.registry.lock().fetches_dispatched += 1;
        let timeout = self.inner.config.read().load_timeout();
        debug!(identifier, location = %location, ?timeout, "dispatching fetch");

        let loader = self.clone();
        runtime.spawn(async move {
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, fetch).await {
                    Ok(result) => FetchOutcome::from_result(result),
                    Err(_) => FetchOutcome::TimedOut(limit),
                },
                None => FetchOutcome::from_result(fetch.await),
            };
            loader.complete_fetch(&location, outcome);
        });
    }

    /// Fail whatever the fetch of `location` was supposed to define but didn't.
    fn complete_fetch(&self, location: &str, outcome: FetchOutcome) {
        let settled = self
            .inner
            .registry
            .lock()
            .settle_location(location, &outcome);

        if settled.is_empty() {
            trace!(location, ?outcome, "fetch settled");
        }
        for (err, pending) in settled {
            warn!(identifier = err.identifier().unwrap_or_default(), error = %err, "module failed to load");
            for continuation in pending {
                continuation(Err(err.clone()));
            }
        }
    }

    fn log_transition(&self, identifier: &str, state: ModuleState) {
        if self.inner.config.read().debug {
            debug!(identifier, ?state, "module transition");
        } else {
            trace!(identifier, ?state, "module transition");
        }
    }
}

impl ModuleSink for Loader {
    fn define(&self, identifier: &str, definition: Definition) {
        Loader::define(self, identifier, definition);
    }
}

impl Requirer for Loader {
    fn require(&self, identifier: &str) -> Result<Exports, LoadError> {
        Loader::require(self, identifier)
    }

    fn use_modules(&self, identifiers: Vec<String>, continuation: JoinContinuation) {
        Loader::use_modules(self, identifiers, continuation);
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never hold the config lock while taking the registry lock.
        let config = self.config();
        f.debug_struct("Loader")
            .field("config", &config)
            .field("stats", &self.stats())
            .finish()
    }
}
