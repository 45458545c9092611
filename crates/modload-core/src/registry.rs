//! The module registry.
//!
//! Single source of truth for "does this module exist yet". Owns every
//! [`Module`] record plus the location bookkeeping the loader protocol reads
//! and writes. Records are created on first reference and never evicted.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use modload_resolver::Resolver;
use modload_types::{Definition, LoadError, ModuleInfo};
use serde::Serialize;
use tracing::{trace, warn};

use crate::module::{Module, ModuleState, ReadyContinuation};

/// Point-in-time counters for a loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub modules: usize,
    pub declared: usize,
    pub loading: usize,
    pub loaded: usize,
    pub initializing: usize,
    pub initialized: usize,
    pub failed: usize,
    /// Identifiers some caller asked to use.
    pub requested: usize,
    /// Identifiers whose code arrived before anyone asked for them.
    pub declared_ahead: usize,
    pub loaded_locations: usize,
    pub loading_locations: usize,
    /// Locations whose fetch failed or timed out.
    pub failed_locations: usize,
    /// Fetches handed to the transport.
    pub fetches_dispatched: usize,
    /// Requests that joined a fetch already in flight.
    pub dedup_hits: usize,
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    Completed,
    Failed(String),
    TimedOut(Duration),
}

impl FetchOutcome {
    pub(crate) fn from_result(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => FetchOutcome::Completed,
            Err(err) => FetchOutcome::Failed(format!("{:#}", err)),
        }
    }

    pub(crate) fn arrived(&self) -> bool {
        matches!(self, FetchOutcome::Completed)
    }

    /// Error for a module that expected its code from this fetch.
    pub(crate) fn error_for(&self, info: &ModuleInfo) -> LoadError {
        let identifier = info.identifier.clone();
        let location = info.location.clone();
        match self {
            FetchOutcome::Completed => LoadError::NotDefined {
                identifier,
                location,
            },
            FetchOutcome::Failed(message) => LoadError::Transport {
                identifier,
                location,
                message: message.clone(),
            },
            FetchOutcome::TimedOut(limit) => LoadError::Timeout {
                identifier,
                location,
                after_ms: limit.as_millis() as u64,
            },
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) resolver: Resolver,
    modules: HashMap<String, Module>,
    /// Locations whose code has arrived.
    pub(crate) loaded_locations: HashSet<String>,
    /// Locations with a fetch in flight.
    pub(crate) loading_locations: HashSet<String>,
    /// Locations whose fetch failed or timed out. Never refetched.
    pub(crate) failed_locations: HashMap<String, FetchOutcome>,
    pub(crate) requested: HashSet<String>,
    pub(crate) declared_ahead: HashSet<String>,
    pub(crate) fetches_dispatched: usize,
    pub(crate) dedup_hits: usize,
}

impl Registry {
    pub(crate) fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    /// Cached record for `identifier`, creating it (state `Declared`) with a
    /// freshly resolved location on first reference.
    pub(crate) fn get_or_create(&mut self, identifier: &str) -> &mut Module {
        let resolver = &self.resolver;
        self.modules
            .entry(identifier.to_string())
            .or_insert_with(|| {
                let location = resolver.resolve(identifier);
                trace!(identifier, location = %location, "module declared");
                Module::new(identifier, location)
            })
    }

    pub(crate) fn get(&self, identifier: &str) -> Option<&Module> {
        self.modules.get(identifier)
    }

    pub(crate) fn get_mut(&mut self, identifier: &str) -> Option<&mut Module> {
        self.modules.get_mut(identifier)
    }

    /// Attach a defining function.
    ///
    /// When a caller already asked for this identifier the module becomes
    /// loaded and the result says whether continuations are queued on it.
    /// Otherwise the module is recorded as declared ahead and `None` returned.
    pub(crate) fn register_definition(
        &mut self,
        identifier: &str,
        definition: Definition,
    ) -> Option<bool> {
        let module = self.get_or_create(identifier);
        match module.state {
            ModuleState::Initializing | ModuleState::Initialized | ModuleState::Failed => {
                warn!(
                    identifier,
                    state = ?module.state,
                    "ignoring definition for a module that already ran"
                );
                return None;
            }
            _ => {}
        }
        if module.defined {
            warn!(identifier, "module defined more than once; keeping the latest definition");
        }
        module.definition = Some(definition);
        module.defined = true;

        if self.requested.contains(identifier) {
            Some(self.become_loaded(identifier))
        } else {
            self.declared_ahead.insert(identifier.to_string());
            None
        }
    }

    /// Move a module to `Loaded` and record its location as arrived.
    ///
    /// Queued continuations stay on the module for the initializer to
    /// deliver in order. Returns whether any are queued.
    pub(crate) fn become_loaded(&mut self, identifier: &str) -> bool {
        self.declared_ahead.remove(identifier);
        let Some(module) = self.modules.get_mut(identifier) else {
            return false;
        };
        if matches!(module.state, ModuleState::Declared | ModuleState::Loading) {
            module.state = ModuleState::Loaded;
        }
        let waiting = !module.pending.is_empty();
        let location = module.location().to_string();
        self.loaded_locations.insert(location);
        waiting
    }

    /// Fail `identifier` with the stored outcome of its location's fetch.
    ///
    /// `None` unless that fetch failed or timed out.
    pub(crate) fn fail_from_location(
        &mut self,
        identifier: &str,
    ) -> Option<(LoadError, Vec<ReadyContinuation>)> {
        let module = self.modules.get_mut(identifier)?;
        let outcome = self.failed_locations.get(module.location())?;
        let error = outcome.error_for(&module.info);
        let pending = module.fail(error.clone());
        Some((error, pending))
    }

    /// Close out the fetch for `location`.
    ///
    /// Every module still `Loading` from that location fails with the error
    /// the outcome maps to; their continuations are returned for delivery.
    /// A failed outcome is remembered for identifiers requested later.
    pub(crate) fn settle_location(
        &mut self,
        location: &str,
        outcome: &FetchOutcome,
    ) -> Vec<(LoadError, Vec<ReadyContinuation>)> {
        self.loading_locations.remove(location);
        if outcome.arrived() {
            self.loaded_locations.insert(location.to_string());
        } else {
            self.failed_locations.insert(location.to_string(), outcome.clone());
        }

        let stranded: Vec<String> = self
            .modules
            .values()
            .filter(|m| m.location() == location && m.state == ModuleState::Loading)
            .map(|m| m.identifier().to_string())
            .collect();

        stranded
            .iter()
            .filter_map(|identifier| {
                let module = self.modules.get_mut(identifier)?;
                let error = outcome.error_for(&module.info);
                let pending = module.fail(error.clone());
                Some((error, pending))
            })
            .collect()
    }

    pub(crate) fn stats(&self) -> LoaderStats {
        let mut stats = LoaderStats {
            modules: self.modules.len(),
            requested: self.requested.len(),
            declared_ahead: self.declared_ahead.len(),
            loaded_locations: self.loaded_locations.len(),
            loading_locations: self.loading_locations.len(),
            failed_locations: self.failed_locations.len(),
            fetches_dispatched: self.fetches_dispatched,
            dedup_hits: self.dedup_hits,
            ..LoaderStats::default()
        };
        for module in self.modules.values() {
            match module.state {
                ModuleState::Declared => stats.declared += 1,
                ModuleState::Loading => stats.loading += 1,
                ModuleState::Loaded => stats.loaded += 1,
                ModuleState::Initializing => stats.initializing += 1,
                ModuleState::Initialized => stats.initialized += 1,
                ModuleState::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modload_types::definition;

    fn registry() -> Registry {
        Registry::new(Resolver::new(Some("/static")))
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let mut registry = registry();
        registry.get_or_create("a").exports.insert("k", serde_json::json!(1));

        let again = registry.get_or_create("a");
        assert_eq!(again.location(), "/static/a");
        assert_eq!(again.exports.get("k"), Some(serde_json::json!(1)));
        assert_eq!(registry.stats().modules, 1);
    }

    #[test]
    fn test_definition_before_request_is_declared_ahead() {
        let mut registry = registry();
        let drained = registry.register_definition("a", definition(|_| Ok(None)));

        assert!(drained.is_none());
        assert!(registry.declared_ahead.contains("a"));
        assert_eq!(registry.get("a").map(|m| m.state), Some(ModuleState::Declared));
    }

    #[test]
    fn test_definition_after_request_becomes_loaded() {
        let mut registry = registry();
        registry.requested.insert("a".into());
        registry.get_or_create("a").pending.push(Box::new(|_| {}));

        let waiting = registry
            .register_definition("a", definition(|_| Ok(None)))
            .expect("requested module becomes loaded");

        assert!(waiting);
        let module = registry.get("a").unwrap();
        assert_eq!(module.state, ModuleState::Loaded);
        // The queue stays put until the module is initialized.
        assert_eq!(module.pending.len(), 1);
        assert!(registry.loaded_locations.contains("/static/a"));
        assert!(!registry.declared_ahead.contains("a"));
    }

    #[test]
    fn test_settle_location_fails_only_loading_modules() {
        let mut registry = registry();
        registry.loading_locations.insert("/static/shared".into());
        registry.get_or_create("http://x/y");
        let module = registry.get_or_create("shared");
        module.state = ModuleState::Loading;
        module.pending.push(Box::new(|_| {}));

        let settled =
            registry.settle_location("/static/shared", &FetchOutcome::Failed("boom".into()));

        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].1.len(), 1);
        assert_eq!(settled[0].0.identifier(), Some("shared"));
        assert!(registry.loading_locations.is_empty());
        assert!(!registry.loaded_locations.contains("/static/shared"));
        assert_eq!(registry.get("http://x/y").map(|m| m.state), Some(ModuleState::Declared));
    }

    #[test]
    fn test_failed_location_answers_later_identifiers() {
        let mut registry = registry();
        let timed_out = FetchOutcome::TimedOut(Duration::from_millis(50));
        registry.settle_location("http://cdn/x", &timed_out);
        assert_eq!(registry.stats().failed_locations, 1);

        registry.get_or_create("http://cdn/x").pending.push(Box::new(|_| {}));
        let (error, pending) = registry
            .fail_from_location("http://cdn/x")
            .expect("location is known to have failed");

        assert!(matches!(error, LoadError::Timeout { after_ms: 50, .. }));
        assert_eq!(pending.len(), 1);
        assert_eq!(registry.get("http://cdn/x").map(|m| m.state), Some(ModuleState::Failed));
        assert!(registry.fail_from_location("elsewhere").is_none());
    }

    #[test]
    fn test_arrived_location_is_not_remembered_as_failed() {
        let mut registry = registry();
        registry.get_or_create("a");
        registry.settle_location("/static/a", &FetchOutcome::Completed);

        assert!(registry.loaded_locations.contains("/static/a"));
        assert!(registry.fail_from_location("a").is_none());
    }

    #[test]
    fn test_stats_counts_states() {
        let mut registry = registry();
        registry.get_or_create("a");
        registry.get_or_create("b").state = ModuleState::Initialized;
        registry.fetches_dispatched = 2;

        let stats = registry.stats();
        assert_eq!(stats.modules, 2);
        assert_eq!(stats.declared, 1);
        assert_eq!(stats.initialized, 1);
        assert_eq!(stats.fetches_dispatched, 2);
    }
}
