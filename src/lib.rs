//! Minimal HTTP request router.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::listener ──▶ http::server ──▶ routing ──┐
//!                     (accept, limits)  (hyper, tower)  (match)    │
//!                                                                  ▼
//!                                                       http::request (decorate)
//!                                                                  │
//!                                                                  ▼
//!     Client Response                                       handler(Request, Response)
//!     ◀────────────── http::response ◀─────────────────────────────┘
//!                     (status, JSON/text, CORS)
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```
//!
//! # Example
//!
//! ```no_run
//! use axum::http::StatusCode;
//! use express_plus::App;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = App::new();
//! app.get("/users/:id", |req, res| async move {
//!     res.send_json(json!({ "id": req.param("id") }))
//! });
//! app.post("/users", |req, res| async move {
//!     res.set_status(StatusCode::CREATED).send_json(req.body())
//! });
//! app.listen(3001, |addr| println!("Listening on {addr}")).await?;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

// Application
pub mod users;

pub use config::ServerConfig;
pub use http::{App, Request, Response, Sent};
pub use lifecycle::Shutdown;
pub use routing::Method;
