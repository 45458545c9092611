//! The exports cell.
//!
//! A module's exports start out as an empty JSON object. While the module's
//! defining function runs it may fill that object in place; when it returns a
//! value, the cell's contents are swapped for that value exactly once. Every
//! clone of an [`Exports`] observes the same cell, so a dependent that grabbed
//! the exports early (a circular `require`) sees the final value once the
//! module finishes initializing.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Clone)]
pub struct Exports {
    value: Arc<RwLock<Value>>,
    finalized: Arc<AtomicBool>,
}

impl Default for Exports {
    fn default() -> Self {
        Self::new()
    }
}

impl Exports {
    /// A fresh cell holding an empty object.
    pub fn new() -> Self {
        Self {
            value: Arc::new(RwLock::new(Value::Object(Map::new()))),
            finalized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Clone of the current value.
    pub fn snapshot(&self) -> Value {
        self.value.read().clone()
    }

    /// Look up a top-level key of an object value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.value.read().get(key).cloned()
    }

    /// Set a top-level key, returning the previous value.
    ///
    /// No-op when the exports have been replaced with a non-object value.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        match &mut *self.value.write() {
            Value::Object(map) => map.insert(key.into(), value),
            _ => None,
        }
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&self.value.read())
    }

    /// True for `null` and for an object with no keys.
    pub fn is_empty(&self) -> bool {
        match &*self.value.read() {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether the owning module has finished initializing.
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Seal the cell after the defining function returned.
    ///
    /// A `replacement` swaps the contents unless it is empty in the sense of
    /// [`is_empty_replacement`]: `null`, `false`, `0` and `""` keep whatever
    /// the defining function left in place. Returns `false` and leaves the
    /// cell untouched if it was already sealed.
    pub fn finalize(&self, replacement: Option<Value>) -> bool {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(value) = replacement.filter(|v| !is_empty_replacement(v)) {
            *self.value.write() = value;
        }
        true
    }

    /// Whether two handles point at the same module's cell.
    pub fn ptr_eq(&self, other: &Exports) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

/// Whether a defining function's return value counts as "nothing returned".
pub fn is_empty_replacement(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

impl fmt::Debug for Exports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("value", &*self.value.read())
            .field("finalized", &self.is_finalized())
            .finish()
    }
}

impl Serialize for Exports {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.read().serialize(serializer)
    }
}
