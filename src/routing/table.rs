//! Route storage and lookup.
//!
//! # Responsibilities
//! - Store (pattern, handler) pairs in registration order
//! - Resolve a request path to the first matching handler
//! - Capture regex groups for the handler in declaration order

use regex::Regex;
use std::sync::{Arc, RwLock};

use crate::dispatch::{Completer, Query};

/// Application-supplied function invoked on a route match.
///
/// The handler receives the parsed query parameters, the pattern-match
/// result, and the one-shot [`Completer`] it must eventually invoke. A
/// handler may complete synchronously or move the completer into a spawned
/// task and complete later.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, query: Query, path_match: PathMatch, completer: Completer);
}

impl<F> Handler for F
where
    F: Fn(Query, PathMatch, Completer) + Send + Sync + 'static,
{
    fn handle(&self, query: Query, path_match: PathMatch, completer: Completer) {
        self(query, path_match, completer)
    }
}

/// The structured result of matching a pattern against a request path.
///
/// Captured groups appear in declaration order; group 0 (the full match) is
/// kept separately as [`PathMatch::matched`].
#[derive(Debug, Clone)]
pub struct PathMatch {
    matched: String,
    groups: Vec<Option<String>>,
}

impl PathMatch {
    fn from_captures(caps: &regex::Captures<'_>) -> Self {
        Self {
            matched: caps[0].to_string(),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// The full text matched by the pattern.
    pub fn matched(&self) -> &str {
        &self.matched
    }

    /// Captured group `index` (1-based, as in the pattern), if it participated
    /// in the match.
    pub fn group(&self, index: usize) -> Option<&str> {
        if index == 0 {
            return Some(&self.matched);
        }
        self.groups.get(index - 1).and_then(|g| g.as_deref())
    }

    /// All captured groups in declaration order.
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }
}

/// A registered (pattern, handler) pair. Immutable once registered.
struct Route {
    pattern: Regex,
    handler: Arc<dyn Handler>,
}

/// Ordered collection of routes, first-match-wins.
///
/// Reads dominate; the lock exists so registration after the server is
/// listening stays serialized against concurrent resolution. Critical
/// sections never await.
#[derive(Default)]
pub struct RouteTable {
    routes: RwLock<Vec<Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Registration order is resolution order.
    pub fn register(&self, pattern: Regex, handler: Arc<dyn Handler>) {
        let mut routes = self.routes.write().expect("route table lock poisoned");
        tracing::debug!(pattern = %pattern, position = routes.len(), "Route registered");
        routes.push(Route { pattern, handler });
    }

    /// Resolve `path` to the first route whose pattern matches, together
    /// with the match result. Matching is purely syntactic against the path;
    /// handlers branch on method or body themselves if they need to.
    pub fn resolve(&self, path: &str) -> Option<(Arc<dyn Handler>, PathMatch)> {
        let routes = self.routes.read().expect("route table lock poisoned");
        for route in routes.iter() {
            if let Some(caps) = route.pattern.captures(path) {
                return Some((Arc::clone(&route.handler), PathMatch::from_captures(&caps)));
            }
        }
        None
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.read().expect("route table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
