//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     app.get("/users/:id", handler)
//!     → router.rs (RouteTable::register, keyed by Method)
//!     → matcher.rs (Pattern::parse)
//!
//! Incoming request (method, path):
//!     → router.rs (lookup routes for method)
//!     → matcher.rs (anchored segment match, capture params)
//!     → Return: RouteMatch { route, params } or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable once serving starts
//! - No regex in the hot path
//! - Deterministic: first registered pattern that matches wins

pub mod matcher;
pub mod router;

pub use matcher::{Params, Pattern};
pub use router::{HandlerFn, HandlerFuture, Method, Route, RouteMatch, RouteTable};
