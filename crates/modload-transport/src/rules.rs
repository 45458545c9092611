//! Location rewrite rules.
//!
//! Rules run in registration order against every outgoing [`FetchRequest`]
//! and may rewrite any part of it (e.g. append a cache-busting query string,
//! point a prefix at a mirror, set a charset).

use std::fmt;
use std::sync::Arc;

use crate::FetchRequest;

pub type PathRule = Arc<dyn Fn(&mut FetchRequest) + Send + Sync>;

#[derive(Clone, Default)]
pub struct PathRules {
    rules: Vec<PathRule>,
}

impl PathRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: impl Fn(&mut FetchRequest) + Send + Sync + 'static) {
        self.rules.push(Arc::new(rule));
    }

    pub fn apply(&self, request: &mut FetchRequest) {
        for rule in &self.rules {
            rule(request);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for PathRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathRules")
            .field("len", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_apply_in_order() {
        let mut rules = PathRules::new();
        rules.push(|req| req.location.push_str(".json"));
        rules.push(|req| {
            req.location = req.location.replacen("/static", "https://mirror", 1);
        });

        let mut request = FetchRequest::new("/static/app");
        rules.apply(&mut request);
        assert_eq!(request.location, "https://mirror/app.json");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_empty_rules_leave_request_alone() {
        let rules = PathRules::new();
        let mut request = FetchRequest::new("lib");
        rules.apply(&mut request);
        assert_eq!(request, FetchRequest::new("lib"));
        assert!(rules.is_empty());
    }
}
