//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, middleware, dispatch)
//!     → routing (match method + path)
//!     → request.rs (request ID, query, params, JSON body)
//!     → handler(Request, Response)
//!     → response.rs (status, headers, body; written once)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;

pub use error::DispatchError;
pub use request::{BodyLimits, Query, Request, UuidRequestId, X_REQUEST_ID};
pub use response::{HttpWriter, Response, ResponseWriter, Sent};
pub use server::App;
