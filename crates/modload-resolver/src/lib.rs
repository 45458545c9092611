//! modload Resolver
//!
//! Maps symbolic module identifiers to fetchable locations.
//!
//! - Identifiers that already look like absolute locations (they contain the
//!   scheme delimiter `:`, e.g. `http://cdn/x.js`) are used verbatim.
//! - Everything else is joined onto the configured base url, or used verbatim
//!   when no base url is configured.
//!
//! ```
//! use modload_resolver::Resolver;
//!
//! let resolver = Resolver::new(Some("/static/"));
//! assert_eq!(resolver.resolve("foo"), "/static/foo");
//! assert_eq!(resolver.resolve("http://cdn/x.js"), "http://cdn/x.js");
//! ```

pub mod location;

pub use location::{is_absolute_location, normalize_base_url, Resolver, SCHEME_DELIMITER};
