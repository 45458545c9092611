//! Location resolution.

use tracing::debug;

/// Presence of this character marks an identifier as an absolute location.
pub const SCHEME_DELIMITER: char = ':';

/// Check whether an identifier is already a fetchable location.
pub fn is_absolute_location(identifier: &str) -> bool {
    identifier.contains(SCHEME_DELIMITER)
}

/// Normalize a configured base url.
///
/// Strips exactly one trailing `/`. An empty result means "no prefix".
///
/// ```
/// use modload_resolver::normalize_base_url;
///
/// assert_eq!(normalize_base_url("/static/"), Some("/static".to_string()));
/// assert_eq!(normalize_base_url("/static//"), Some("/static/".to_string()));
/// assert_eq!(normalize_base_url("/"), None);
/// ```
pub fn normalize_base_url(base_url: &str) -> Option<String> {
    let trimmed = base_url.strip_suffix('/').unwrap_or(base_url);
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolver {
    base_url: Option<String>,
}

impl Resolver {
    pub fn new(base_url: Option<&str>) -> Self {
        Self {
            base_url: base_url.and_then(normalize_base_url),
        }
    }

    /// The normalized base url, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Replace the base url. Locations resolved earlier are not affected.
    pub fn set_base_url(&mut self, base_url: Option<&str>) {
        self.base_url = base_url.and_then(normalize_base_url);
        debug!(base_url = ?self.base_url, "resolver base url configured");
    }

    /// Map an identifier to the location it should be fetched from.
    pub fn resolve(&self, identifier: &str) -> String {
        if is_absolute_location(identifier) {
            return identifier.to_string();
        }
        match &self.base_url {
            Some(base) => format!(
                "{}/{}",
                base,
                identifier.strip_prefix('/').unwrap_or(identifier)
            ),
            None => identifier.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_prefix() {
        let resolver = Resolver::new(Some("/static"));
        assert_eq!(resolver.resolve("foo"), "/static/foo");
        assert_eq!(resolver.resolve("lib/util"), "/static/lib/util");
        assert_eq!(resolver.resolve("/rooted"), "/static/rooted");
    }

    #[test]
    fn test_only_one_leading_separator_is_dropped() {
        let resolver = Resolver::new(Some("/static"));
        assert_eq!(resolver.resolve("//x"), "/static//x");
        assert_eq!(resolver.resolve("///a/b"), "/static///a/b");
    }

    #[test]
    fn test_resolve_absolute_is_verbatim() {
        let resolver = Resolver::new(Some("/static"));
        assert_eq!(resolver.resolve("http://cdn/x.js"), "http://cdn/x.js");
        assert_eq!(resolver.resolve("file:///tmp/a.json"), "file:///tmp/a.json");
    }

    #[test]
    fn test_resolve_without_prefix() {
        let resolver = Resolver::default();
        assert_eq!(resolver.base_url(), None);
        assert_eq!(resolver.resolve("foo"), "foo");
    }

    #[test]
    fn test_trailing_separator_stripped_once() {
        assert_eq!(Resolver::new(Some("/static/")).base_url(), Some("/static"));
        assert_eq!(Resolver::new(Some("cdn//")).base_url(), Some("cdn/"));
        assert_eq!(Resolver::new(Some("")).base_url(), None);
        assert_eq!(Resolver::new(Some("/")).resolve("foo"), "foo");
    }

    #[test]
    fn test_set_base_url() {
        let mut resolver = Resolver::default();
        resolver.set_base_url(Some("https://cdn.example.com/mods/"));
        assert_eq!(
            resolver.resolve("app"),
            "https://cdn.example.com/mods/app"
        );
        resolver.set_base_url(None);
        assert_eq!(resolver.resolve("app"), "app");
    }
}
