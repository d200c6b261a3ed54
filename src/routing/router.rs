//! Route table and lookup.
//!
//! # Responsibilities
//! - Store routes keyed by (method, pattern)
//! - Look up the routes registered for a method
//! - Find the first route whose pattern matches a path
//!
//! # Design Decisions
//! - Fixed-size table indexed by `Method`, no string-keyed method lookup
//! - Per-method routes kept in registration order (first registered wins)
//! - Re-registering a pattern replaces the handler in place
//! - Built before serving, then shared read-only behind an `Arc`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http::{Request, Response, Sent};
use crate::routing::matcher::{Params, Pattern};

/// Boxed future returned by a route handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Sent> + Send>>;

/// A type-erased route handler.
pub type HandlerFn = Arc<dyn Fn(Request, Response) -> HandlerFuture + Send + Sync>;

/// The HTTP verbs a route can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const COUNT: usize = 5;

    pub const ALL: [Method; Method::COUNT] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Map an HTTP method onto a routable verb. Anything else is unroutable.
    pub fn from_http(method: &axum::http::Method) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == method.as_str())
    }

    /// Methods whose request body is read and parsed as JSON.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered (method, pattern, handler) association.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: Pattern,
    handler: HandlerFn,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerFn {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}

/// Routes grouped by method.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    slots: [Vec<Route>; Method::COUNT],
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the handler for (method, pattern), replacing any previous one.
    ///
    /// The pattern is not validated; it is compiled as-is.
    pub fn register(&mut self, method: Method, pattern: &str, handler: HandlerFn) {
        let slot = &mut self.slots[method.index()];

        if let Some(existing) = slot.iter_mut().find(|r| r.pattern.as_str() == pattern) {
            tracing::debug!(method = %method, pattern = %pattern, "Replacing route handler");
            existing.handler = handler;
            return;
        }

        tracing::debug!(method = %method, pattern = %pattern, "Route registered");
        slot.push(Route {
            method,
            pattern: Pattern::parse(pattern),
            handler,
        });
    }

    /// All routes registered for `method`, in registration order.
    pub fn lookup(&self, method: Method) -> &[Route] {
        &self.slots[method.index()]
    }

    /// First route for `method` whose pattern matches `path`.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_>> {
        self.lookup(method).iter().find_map(|route| {
            route
                .pattern
                .matches(path)
                .map(|params| RouteMatch { route, params })
        })
    }

    /// Total number of registered routes across all methods.
    pub fn len(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
