//! Application builder, dispatcher and HTTP server.
//!
//! # Responsibilities
//! - Expose the registration API (`get`, `post`, `put`, `patch`, `delete`)
//! - Freeze the route table when serving starts
//! - Dispatch each request: match, decorate, invoke handler or answer 404
//! - Wire up middleware (tracing, request ID, request timeout)
//! - Accept connections and drive them with hyper's HTTP/1.1 server
//!
//! # Request States
//! ```text
//! RECEIVED → MATCHING ─┬─ MATCHED → DECORATING → HANDLING → DONE
//!                      └─ UNMATCHED → NOT_FOUND → DONE
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use tokio::sync::broadcast;
use tower::ServiceExt;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::error::DispatchError;
use crate::http::request::{BodyLimits, Request, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{HttpWriter, Response, Sent};
use crate::lifecycle::{signals, Shutdown};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::observability::metrics;
use crate::routing::{HandlerFn, HandlerFuture, Method, RouteTable};

/// How long `serve` waits for open connections after shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every dispatched request.
#[derive(Clone)]
struct DispatchState {
    routes: Arc<RouteTable>,
    limits: BodyLimits,
}

/// An application: a route table plus server configuration.
///
/// Routes are registered on `&mut App`; serving consumes the app, so the
/// table can no longer change once requests are being handled.
#[derive(Debug, Default)]
pub struct App {
    routes: RouteTable,
    config: ServerConfig,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            routes: RouteTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Register `handler` for (method, pattern), replacing any previous handler.
    pub fn route<F, Fut>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        let handler: HandlerFn =
            Arc::new(move |req: Request, res: Response| -> HandlerFuture {
                Box::pin(handler(req, res))
            });
        self.routes.register(method, pattern, handler);
        self
    }

    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        self.route(Method::Get, pattern, handler)
    }

    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        self.route(Method::Post, pattern, handler)
    }

    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        self.route(Method::Put, pattern, handler)
    }

    pub fn patch<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        self.route(Method::Patch, pattern, handler)
    }

    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Sent> + Send + 'static,
    {
        self.route(Method::Delete, pattern, handler)
    }

    /// Freeze the routes and build the dispatching service.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let state = DispatchState {
            routes: Arc::new(self.routes),
            limits: BodyLimits::from(&self.config.limits),
        };

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.limits.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Bind `port` on the configured interface, call `on_ready`, then serve
    /// until Ctrl+C.
    pub async fn listen<F>(self, port: u16, on_ready: F) -> Result<(), ListenerError>
    where
        F: FnOnce(SocketAddr),
    {
        let listener_config = self
            .config
            .listener
            .with_port(port)
            .map_err(|e| ListenerError::Bind(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;
        let listener = Listener::bind(&listener_config).await?;
        on_ready(listener.local_addr().map_err(ListenerError::Bind)?);

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

        self.serve(listener, server_shutdown).await
    }

    /// Serve connections from `listener` until `shutdown` fires.
    ///
    /// Open connections are asked to finish their in-flight request and are
    /// given a bounded time to close.
    pub async fn serve(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        let addr = listener.local_addr().map_err(ListenerError::Accept)?;
        let router = self.into_router();
        let tracker = ConnectionTracker::new();

        tracing::info!(address = %addr, "HTTP server starting");

        loop {
            let (stream, peer_addr, permit) = tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }
                },
            };

            let router = router.clone();
            let guard = tracker.track();
            let mut conn_shutdown = shutdown.resubscribe();

            tokio::spawn(async move {
                let _permit = permit;
                let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
                    router.clone().oneshot(request)
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                tokio::pin!(conn);

                let result = tokio::select! {
                    result = conn.as_mut() => result,
                    _ = conn_shutdown.recv() => {
                        conn.as_mut().graceful_shutdown();
                        conn.await
                    }
                };

                if let Err(e) = result {
                    tracing::debug!(
                        connection_id = %guard.id(),
                        peer_addr = %peer_addr,
                        error = %e,
                        "Connection closed with error"
                    );
                }
            });
        }

        if !tracker.drain(DRAIN_TIMEOUT).await {
            tracing::warn!(
                active_connections = tracker.active_count(),
                "Connections still open after drain timeout"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Match, decorate and hand the request to its route handler.
async fn dispatch(
    State(state): State<DispatchState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();

    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let path = parts.uri.path().to_string();
    let method_label = parts.method.to_string();

    // MATCHING
    let matched = Method::from_http(&parts.method)
        .and_then(|method| state.routes.find(method, &path).map(|found| (method, found)));

    let Some((method, found)) = matched else {
        tracing::debug!(request_id = %request_id, method = %method_label, path = %path, "No route matched");
        metrics::record_request(&method_label, 404, "none", start_time);
        return DispatchError::NoRouteMatch {
            method: method_label,
            path,
        }
        .into_response();
    };

    let handler = Arc::clone(found.route.handler());
    let pattern = found.route.pattern().as_str().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %pattern,
        "Route matched"
    );

    // DECORATING
    let request = match Request::decorate(method, parts, body, found.params, &state.limits).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(request_id = %request_id, route = %pattern, error = %e, "Request decoration failed");
            metrics::record_request(&method_label, e.status().as_u16(), &pattern, start_time);
            return e.into_response();
        }
    };

    // HANDLING
    let sent = handler(request, Response::new(HttpWriter::default())).await;
    let response = sent.into_writer().into_response();

    metrics::record_request(&method_label, response.status().as_u16(), &pattern, start_time);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};

    async fn send(app: App, request: axum::http::Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = app.into_router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    fn get(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unmatched_is_not_found() {
        let mut app = App::new();
        app.get("/users", |_req, res| async move { res.send_json(json!({ "user": [] })) });

        let (status, headers, body) = send(app, get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body, b"Not Found");
    }

    #[tokio::test]
    async fn test_unsupported_method_is_not_found() {
        let mut app = App::new();
        app.get("/users", |_req, res| async move { res.send_text("ok") });

        let request = axum::http::Request::builder()
            .method("OPTIONS")
            .uri("/users")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_params_and_query_reach_handler() {
        let mut app = App::new();
        app.get("/users/:id", |req, res| async move {
            res.send_json(json!({
                "id": req.param("id"),
                "a": req.query().get("a"),
            }))
        });

        let (status, headers, body) = send(app, get("/users/42?a=1&a=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(headers.contains_key(X_REQUEST_ID));
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "id": "42", "a": "2" }));
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_before_handler() {
        let mut config = ServerConfig::default();
        config.limits.max_body_bytes = 8;
        let mut app = App::with_config(config);
        app.post("/echo", |req, res| async move { res.send_json(req.body()) });

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from(r#"{"name":"a much longer body"}"#))
            .unwrap();
        let (status, _, body) = send(app, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, b"Payload Too Large");
    }

    #[tokio::test]
    async fn test_status_set_by_handler() {
        let mut app = App::new();
        app.delete("/users/:id", |_req, res| async move {
            res.set_status(StatusCode::ACCEPTED).send_text("gone")
        });

        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri("/users/1")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(app, request).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body, b"gone");
    }
}
