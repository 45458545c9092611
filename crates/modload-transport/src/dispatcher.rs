//! Dispatch front-end for a [`Transport`].
//!
//! The dispatcher remembers every location it has ever handed to the
//! transport and refuses to hand it over twice, then applies the registered
//! [`PathRules`] to build the actual [`FetchRequest`]. Dedup is keyed on the
//! location *before* rewriting.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use modload_types::ModuleSink;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::rules::PathRules;
use crate::{FetchRequest, Transport};

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    rules: RwLock<PathRules>,
    dispatched: Mutex<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            rules: RwLock::new(PathRules::new()),
            dispatched: Mutex::new(HashSet::new()),
        }
    }

    /// Register a rewrite rule applied to every later fetch.
    pub fn add_rule(&self, rule: impl Fn(&mut FetchRequest) + Send + Sync + 'static) {
        self.rules.write().push(rule);
    }

    /// Build the request for `location` without dispatching it.
    pub fn request_for(&self, location: &str) -> FetchRequest {
        let mut request = FetchRequest::new(location);
        self.rules.read().apply(&mut request);
        request
    }

    /// Whether `location` has already been handed to the transport.
    pub fn was_dispatched(&self, location: &str) -> bool {
        self.dispatched.lock().contains(location)
    }

    /// Number of distinct locations handed to the transport.
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().len()
    }

    /// Prepare the fetch for `location`.
    ///
    /// Returns `None` if this location was dispatched before. The returned
    /// future owns everything it needs and can be spawned.
    pub fn dispatch(
        &self,
        location: &str,
        sink: Arc<dyn ModuleSink>,
    ) -> Option<BoxFuture<'static, Result<()>>> {
        if !self.dispatched.lock().insert(location.to_string()) {
            trace!(location, "location already dispatched");
            return None;
        }

        let request = self.request_for(location);
        if request.location != location {
            debug!(location, rewritten = %request.location, "path rules rewrote location");
        }

        let transport = Arc::clone(&self.transport);
        Some(async move { transport.fetch(&request, sink).await }.boxed())
    }
}
