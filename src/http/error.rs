//! Dispatch-layer errors and their HTTP mapping.

use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failures handled by the dispatcher itself. None of them reach a handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered (method, pattern) matches the request.
    #[error("no route matches {method} {path}")]
    NoRouteMatch { method: String, path: String },

    /// Transport error while reading the request body.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    /// Request body exceeded the configured maximum.
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Request body was not complete within the read deadline.
    #[error("request body not received within {timeout:?}")]
    BodyTimeout { timeout: Duration },
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoRouteMatch { .. } => StatusCode::NOT_FOUND,
            DispatchError::BodyRead(_) => StatusCode::BAD_REQUEST,
            DispatchError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DispatchError::BodyTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = status.canonical_reason().unwrap_or("Error");
        (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_found_body() {
        let response = DispatchError::NoRouteMatch {
            method: "GET".into(),
            path: "/missing".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Not Found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DispatchError::BodyRead("reset".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DispatchError::BodyTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DispatchError::BodyTimeout {
                timeout: Duration::from_secs(1)
            }
            .status(),
            StatusCode::REQUEST_TIMEOUT
        );
    }
}
