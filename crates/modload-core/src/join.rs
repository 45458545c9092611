//! Fan-in over module-ready events.
//!
//! A [`FanIn`] holds one slot per requested module, in request order, and a
//! count of slots still empty. Completions may arrive in any order; the
//! continuation fires exactly once, either with every slot filled or with
//! the first error reported.

use std::sync::Arc;

use modload_types::{Exports, JoinContinuation, LoadError};
use parking_lot::Mutex;

pub struct FanIn {
    state: Mutex<FanInState>,
}

struct FanInState {
    results: Vec<Option<Exports>>,
    remaining: usize,
    continuation: Option<JoinContinuation>,
}

impl FanIn {
    /// Wait for `size` completions. With `size == 0` the continuation fires
    /// immediately with no results.
    pub fn new(size: usize, continuation: JoinContinuation) -> Arc<Self> {
        let continuation = if size == 0 {
            continuation(Ok(Vec::new()));
            None
        } else {
            Some(continuation)
        };
        Arc::new(Self {
            state: Mutex::new(FanInState {
                results: vec![None; size],
                remaining: size,
                continuation,
            }),
        })
    }

    /// Record the exports for request slot `index`. Repeated completions of
    /// the same slot are ignored.
    pub fn complete(&self, index: usize, exports: Exports) {
        let fire = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.continuation.is_none() {
                return;
            }
            match state.results.get_mut(index) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(exports);
                    state.remaining -= 1;
                }
                _ => return,
            }
            if state.remaining > 0 {
                return;
            }
            let results: Vec<Exports> = state.results.drain(..).flatten().collect();
            state.continuation.take().map(|continuation| (continuation, results))
        };

        if let Some((continuation, results)) = fire {
            continuation(Ok(results));
        }
    }

    /// Abort the join with `error` unless it already fired.
    pub fn fail(&self, error: LoadError) {
        let continuation = self.state.lock().continuation.take();
        if let Some(continuation) = continuation {
            continuation(Err(error));
        }
    }

    /// Whether the continuation has fired.
    pub fn is_settled(&self) -> bool {
        self.state.lock().continuation.is_none()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().remaining
    }
}
