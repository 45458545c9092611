//! JSON module descriptors.
//!
//! The filesystem and HTTP transports cannot execute native code, so the
//! "code" they fetch is a JSON document describing one or more modules:
//!
//! ```json
//! {
//!   "modules": [
//!     { "id": "lib/math", "exports": { "pi": 3.14159 } },
//!     { "id": "app", "imports": { "math": "lib/math" }, "exports": { "name": "demo" } }
//!   ]
//! }
//! ```
//!
//! A single module object without the `modules` wrapper is accepted too.
//! Each descriptor becomes a defining function that synchronously requires
//! its imports and returns `exports` with every import alias bound to the
//! imported module's exports. Imports therefore have to be loaded already or
//! defined earlier in the same document.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use modload_types::{definition, Definition, ModuleSink};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub exports: Value,
    /// alias -> module identifier
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub imports: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorDocument {
    Bundle { modules: Vec<ModuleDescriptor> },
    Single(ModuleDescriptor),
}

/// Parse a descriptor document.
pub fn parse_descriptors(bytes: &[u8]) -> Result<Vec<ModuleDescriptor>> {
    let document: DescriptorDocument =
        serde_json::from_slice(bytes).context("invalid module descriptor document")?;
    Ok(match document {
        DescriptorDocument::Bundle { modules } => modules,
        DescriptorDocument::Single(module) => vec![module],
    })
}

/// Define every descriptor on `sink`, in document order.
pub fn register_descriptors(descriptors: Vec<ModuleDescriptor>, sink: &dyn ModuleSink) {
    for descriptor in descriptors {
        let identifier = descriptor.id.clone();
        debug!(identifier = %identifier, "registering descriptor module");
        sink.define(&identifier, descriptor.into_definition());
    }
}

impl ModuleDescriptor {
    pub fn into_definition(self) -> Definition {
        definition(move |ctx| {
            let mut exports = match self.exports {
                Value::Null => Value::Object(Map::new()),
                other => other,
            };
            for (alias, dependency) in &self.imports {
                let imported = ctx.require(dependency)?;
                match exports.as_object_mut() {
                    Some(map) => {
                        map.insert(alias.clone(), imported.snapshot());
                    }
                    None => bail!(
                        "module {} exports a non-object value and cannot bind import '{}'",
                        ctx.identifier(),
                        alias
                    ),
                }
            }
            Ok(Some(exports))
        })
    }
}
