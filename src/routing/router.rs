//! Route table: registration and lookup.
//!
//! # Responsibilities
//! - Store registered routes in registration order
//! - Reject duplicate (verb, path) registrations
//! - Resolve a (method, path) pair to a route, a sub-method, or an explicit miss
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan (acceptable for typical route counts)
//! - Exact path matches take priority over sub-method matches
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use std::collections::HashSet;
use std::sync::Arc;

use axum::http::Method;
use thiserror::Error;

use crate::action::{Action, ActionResolver};
use crate::config::RouteEntry;
use crate::routing::matcher::{normalize_path, split_sub_method, Verb};

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A route with the same verb and path is already registered.
    #[error("route {verb} {path} is already registered")]
    Conflict { verb: Verb, path: String },

    /// The handler identifier did not resolve to an action.
    #[error("no action registered for `{0}`")]
    UnknownAction(String),
}

/// A declarative binding of a verb and path to a handler identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub verb: Verb,
    pub path: String,
    pub handler: String,
    pub sub_methods: Option<Vec<String>>,
}

impl From<&RouteEntry> for RouteDescriptor {
    fn from(entry: &RouteEntry) -> Self {
        let spec = entry.spec();
        Self {
            verb: entry.verb(),
            path: spec.path.clone(),
            handler: spec.file.clone(),
            sub_methods: spec.methods.clone(),
        }
    }
}

/// A descriptor together with its resolved action.
pub struct RegisteredRoute {
    descriptor: RouteDescriptor,
    action: Arc<dyn Action>,
}

impl RegisteredRoute {
    pub fn descriptor(&self) -> &RouteDescriptor {
        &self.descriptor
    }

    pub fn action(&self) -> &Arc<dyn Action> {
        &self.action
    }

    fn accepts_sub_method(&self, segment: &str) -> bool {
        self.descriptor
            .sub_methods
            .as_ref()
            .is_some_and(|methods| methods.iter().any(|m| m == segment))
    }
}

impl std::fmt::Debug for RegisteredRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRoute")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Successful lookup result.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a RegisteredRoute,
    /// Trailing segment matched against the route's sub-methods.
    pub sub_method: Option<String>,
}

/// Lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMiss {
    /// No route exists at this path.
    NotFound,
    /// Routes exist at this path, but none for the request method.
    MethodNotAllowed { allowed: Vec<Verb> },
}

/// Ordered set of registered routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<RegisteredRoute>,
    keys: HashSet<(Verb, String)>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configured route entries, resolving each handler.
    pub fn from_config(
        entries: &[RouteEntry],
        resolver: &dyn ActionResolver,
    ) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for entry in entries {
            let descriptor = RouteDescriptor::from(entry);
            let action = resolver
                .resolve(&descriptor.handler)
                .ok_or_else(|| RouteError::UnknownAction(descriptor.handler.clone()))?;
            table.register(descriptor, action)?;
        }
        Ok(table)
    }

    /// Register a route. Fails if the (verb, path) pair is taken.
    pub fn register(
        &mut self,
        descriptor: RouteDescriptor,
        action: Arc<dyn Action>,
    ) -> Result<(), RouteError> {
        let key = (descriptor.verb, normalize_path(&descriptor.path).to_string());
        if self.keys.contains(&key) {
            return Err(RouteError::Conflict {
                verb: descriptor.verb,
                path: descriptor.path,
            });
        }

        tracing::debug!(
            verb = %descriptor.verb,
            path = %descriptor.path,
            handler = %descriptor.handler,
            sub_methods = ?descriptor.sub_methods,
            "Route registered"
        );

        self.keys.insert(key);
        self.routes.push(RegisteredRoute { descriptor, action });
        Ok(())
    }

    /// Resolve a request to a route.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteMiss> {
        let path = normalize_path(path);
        let mut allowed = Vec::new();

        for route in self.routes.iter().filter(|r| normalize_path(&r.descriptor.path) == path) {
            if route.descriptor.verb.matches(method) {
                return Ok(RouteMatch { route, sub_method: None });
            }
            push_unique(&mut allowed, route.descriptor.verb);
        }

        if let Some((base, segment)) = split_sub_method(path) {
            let candidates = self.routes.iter().filter(|r| {
                normalize_path(&r.descriptor.path) == base && r.accepts_sub_method(segment)
            });
            for route in candidates {
                if route.descriptor.verb.matches(method) {
                    return Ok(RouteMatch {
                        route,
                        sub_method: Some(segment.to_string()),
                    });
                }
                push_unique(&mut allowed, route.descriptor.verb);
            }
        }

        if allowed.is_empty() {
            Err(RouteMiss::NotFound)
        } else {
            Err(RouteMiss::MethodNotAllowed { allowed })
        }
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RegisteredRoute> {
        self.routes.iter()
    }
}

fn push_unique(allowed: &mut Vec<Verb>, verb: Verb) {
    if !allowed.contains(&verb) {
        allowed.push(verb);
    }
}
