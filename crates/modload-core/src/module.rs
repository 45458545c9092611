//! Module records and their lifecycle.
//!
//! ```text
//! Declared ──► Loading ──► Loaded ──► Initializing ──► Initialized
//!    │            │                        │
//!    └────────────┴──────► Failed ◄────────┘
//! ```
//!
//! Transitions only move forward. A module whose code arrived before anyone
//! asked for it stays `Declared` (with its definition attached) until the
//! first request promotes it straight to `Loaded`.

use modload_types::{Definition, Exports, LoadError, ModuleInfo};
use serde::Serialize;

/// Waiter queued on a module until it is loaded and initialized.
pub type ReadyContinuation = Box<dyn FnOnce(Result<Exports, LoadError>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    /// Record exists; code has not been requested or has not arrived.
    Declared,
    /// Someone asked for the module and its location is being fetched.
    Loading,
    /// Code has arrived; the defining function has not run yet.
    Loaded,
    /// The defining function is running.
    Initializing,
    /// Exports are final.
    Initialized,
    /// Fetch or initialization failed. Terminal.
    Failed,
}

impl ModuleState {
    pub fn is_loaded(self) -> bool {
        matches!(
            self,
            ModuleState::Loaded | ModuleState::Initializing | ModuleState::Initialized
        )
    }

    pub fn is_initialized(self) -> bool {
        self == ModuleState::Initialized
    }
}

pub(crate) struct Module {
    pub(crate) info: ModuleInfo,
    pub(crate) state: ModuleState,
    /// Taken when the defining function is invoked.
    pub(crate) definition: Option<Definition>,
    /// Whether a definition was ever registered.
    pub(crate) defined: bool,
    pub(crate) exports: Exports,
    pub(crate) failure: Option<LoadError>,
    pub(crate) pending: Vec<ReadyContinuation>,
}

impl Module {
    pub(crate) fn new(identifier: &str, location: String) -> Self {
        Self {
            info: ModuleInfo {
                identifier: identifier.to_string(),
                location,
            },
            state: ModuleState::Declared,
            definition: None,
            defined: false,
            exports: Exports::new(),
            failure: None,
            pending: Vec::new(),
        }
    }

    pub(crate) fn identifier(&self) -> &str {
        &self.info.identifier
    }

    pub(crate) fn location(&self) -> &str {
        &self.info.location
    }

    /// Mark failed and hand back whoever was waiting.
    pub(crate) fn fail(&mut self, error: LoadError) -> Vec<ReadyContinuation> {
        self.state = ModuleState::Failed;
        self.failure = Some(error);
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn failure(&self) -> LoadError {
        self.failure
            .clone()
            .unwrap_or_else(|| LoadError::module_not_found(self.identifier()))
    }
}
