//! Request decoration.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) for every request
//! - Parse the query string into `Query`
//! - Attach path parameters from the route match
//! - Read and parse JSON bodies for POST, PUT and PATCH
//!
//! # Design Decisions
//! - Query keys are single-valued: the last occurrence wins
//! - Missing, empty or malformed JSON bodies become `{}`; the handler still runs
//! - Body reads are bounded by size and by a deadline
//! - Transport errors while reading fail the request before the handler

use std::collections::HashMap;
use std::time::Duration;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::{Map, Value};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::LimitsConfig;
use crate::http::error::DispatchError;
use crate::routing::{Method, Params};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request ID when the client did not send one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query(HashMap<String, String>);

impl Query {
    /// Parse an `application/x-www-form-urlencoded` query component.
    pub fn parse(raw: &str) -> Self {
        // Collecting into a map keeps the last value for repeated keys.
        Self(url::form_urlencoded::parse(raw.as_bytes()).into_owned().collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Size and time bounds for reading a request body.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    pub max_bytes: usize,
    pub read_timeout: Duration,
}

impl From<&LimitsConfig> for BodyLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_bytes: config.max_body_bytes,
            read_timeout: Duration::from_millis(config.body_read_timeout_ms),
        }
    }
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

/// The request context handed to a route handler.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    params: Params,
    query: Query,
    body: Value,
}

impl Request {
    /// A request with no headers, no query and an empty body.
    pub fn new(method: Method, path: impl Into<String>, params: Params) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            params,
            query: Query::default(),
            body: empty_body(),
        }
    }

    /// Decorate an inbound request.
    ///
    /// Waits for the body only when `method` carries one.
    pub async fn decorate(
        method: Method,
        parts: Parts,
        body: Body,
        params: Params,
        limits: &BodyLimits,
    ) -> Result<Self, DispatchError> {
        let body = if method.has_body() {
            read_json_body(body, limits).await?
        } else {
            empty_body()
        };

        Ok(Self {
            method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(Query::parse).unwrap_or_default(),
            headers: parts.headers,
            params,
            body,
        })
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shorthand for `params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    /// Request ID assigned by the server, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}

/// Read a body to completion and parse it as JSON.
pub async fn read_json_body(body: Body, limits: &BodyLimits) -> Result<Value, DispatchError> {
    let collect = Limited::new(body, limits.max_bytes).collect();

    let bytes = match tokio::time::timeout(limits.read_timeout, collect).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(DispatchError::BodyTooLarge {
                limit: limits.max_bytes,
            });
        }
        Ok(Err(e)) => return Err(DispatchError::BodyRead(e.to_string())),
        Err(_) => {
            return Err(DispatchError::BodyTimeout {
                timeout: limits.read_timeout,
            });
        }
    };

    Ok(parse_json_body(&bytes))
}

/// Parse body bytes as JSON; empty or malformed input becomes `{}`.
pub fn parse_json_body(bytes: &Bytes) -> Value {
    if bytes.is_empty() {
        return empty_body();
    }

    serde_json::from_slice(bytes).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Malformed JSON body, using empty object");
        empty_body()
    })
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}
