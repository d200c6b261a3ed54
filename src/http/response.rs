//! Response decoration.
//!
//! # Responsibilities
//! - Record the status code a handler chooses (default 200)
//! - Serialize JSON / plain-text payloads with CORS headers
//! - Write headers exactly once and end the response exactly once
//!
//! # Design Decisions
//! - `send_json` and `send_text` consume the response: a second send does not compile
//! - Handlers return the `Sent` proof, which only a send can construct
//! - Output goes through `ResponseWriter` so the wire side can be swapped in tests

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Sink for a finished response.
pub trait ResponseWriter: Send {
    /// Write the status line and headers.
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap);

    /// Write the body and end the response.
    fn end(&mut self, body: Bytes);
}

/// Writer that buffers the response for the HTTP server.
#[derive(Debug, Default)]
pub struct HttpWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpWriter {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Convert the buffered output into a response for the server.
    pub fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for HttpWriter {
    fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
        self.status = status;
        self.headers = headers;
    }

    fn end(&mut self, body: Bytes) {
        self.body = body;
    }
}

/// Proof that a response has been written and ended.
#[must_use = "handlers must return the Sent value"]
#[derive(Debug)]
pub struct Sent<W = HttpWriter> {
    writer: W,
}

impl<W> Sent<W> {
    /// Recover the writer that received the response.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

/// The response context handed to a route handler.
///
/// Sending consumes the response, so it can only happen once:
///
/// ```compile_fail
/// use express_plus::http::{HttpWriter, Response};
///
/// let res = Response::new(HttpWriter::default());
/// let _sent = res.send_json(serde_json::json!({ "ok": true }));
/// let _again = res.send_json(serde_json::json!({ "ok": true }));
/// ```
#[must_use = "a response must be sent"]
#[derive(Debug)]
pub struct Response<W: ResponseWriter = HttpWriter> {
    status: StatusCode,
    writer: W,
}

impl<W: ResponseWriter> Response<W> {
    pub fn new(writer: W) -> Self {
        Self {
            status: StatusCode::OK,
            writer,
        }
    }

    /// Currently recorded status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Record the status for the eventual header write. Last call wins.
    pub fn set_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Send `value` as JSON with CORS headers.
    pub fn send_json(self, value: impl Serialize) -> Sent<W> {
        match serde_json::to_vec(&value) {
            Ok(body) => self.finish(json_headers(), Bytes::from(body)),
            Err(e) => self.serialization_failed(e),
        }
    }

    /// Send `value` as plain text. Objects, arrays and `null` are sent as JSON.
    pub fn send_text(self, value: impl Serialize) -> Sent<W> {
        let text = match serde_json::to_value(&value) {
            Ok(Value::String(s)) => s,
            Ok(v @ (Value::Bool(_) | Value::Number(_))) => v.to_string(),
            Ok(v) => return self.send_json(v),
            Err(e) => return self.serialization_failed(e),
        };

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(CORS_ALLOW_ORIGIN),
        );
        self.finish(headers, Bytes::from(text))
    }

    fn serialization_failed(self, error: serde_json::Error) -> Sent<W> {
        tracing::error!(error = %error, "Failed to serialize response body");
        self.set_status(StatusCode::INTERNAL_SERVER_ERROR)
            .send_text("Internal Server Error")
    }

    fn finish(mut self, headers: HeaderMap, body: Bytes) -> Sent<W> {
        self.writer.write_head(self.status, headers);
        self.writer.end(body);
        Sent {
            writer: self.writer,
        }
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Records every call made by the response.
    #[derive(Debug, Default)]
    struct RecordingWriter {
        heads: Vec<(StatusCode, HeaderMap)>,
        bodies: Vec<Bytes>,
    }

    impl ResponseWriter for RecordingWriter {
        fn write_head(&mut self, status: StatusCode, headers: HeaderMap) {
            self.heads.push((status, headers));
        }

        fn end(&mut self, body: Bytes) {
            self.bodies.push(body);
        }
    }

    #[test]
    fn test_send_json_writes_head_once() {
        let res = Response::new(RecordingWriter::default());
        let writer = res.send_json(json!({ "user": [] })).into_writer();

        assert_eq!(writer.heads.len(), 1);
        assert_eq!(writer.bodies.len(), 1);

        let (status, headers) = &writer.heads[0];
        assert_eq!(*status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, PATCH, DELETE"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
        assert_eq!(writer.bodies[0], Bytes::from_static(br#"{"user":[]}"#));
    }

    #[test]
    fn test_set_status_chains_last_wins() {
        let res = Response::new(RecordingWriter::default())
            .set_status(StatusCode::BAD_REQUEST)
            .set_status(StatusCode::CREATED);
        assert_eq!(res.status(), StatusCode::CREATED);

        let writer = res.send_json(json!({ "message": "User created" })).into_writer();
        assert_eq!(writer.heads[0].0, StatusCode::CREATED);
    }

    #[test]
    fn test_send_text_plain() {
        let writer = Response::new(RecordingWriter::default())
            .send_text("hello")
            .into_writer();

        let (_, headers) = &writer.heads[0];
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
        assert_eq!(writer.bodies[0], Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_send_text_scalars() {
        let writer = Response::new(RecordingWriter::default())
            .send_text(42)
            .into_writer();
        assert_eq!(writer.bodies[0], Bytes::from_static(b"42"));

        let writer = Response::new(RecordingWriter::default())
            .send_text(false)
            .into_writer();
        assert_eq!(writer.bodies[0], Bytes::from_static(b"false"));
    }

    #[test]
    fn test_send_text_object_defers_to_json() {
        let writer = Response::new(RecordingWriter::default())
            .send_text(json!({ "a": 1 }))
            .into_writer();

        assert_eq!(writer.heads.len(), 1);
        assert_eq!(writer.heads[0].1[header::CONTENT_TYPE], "application/json");
        assert_eq!(writer.bodies[0], Bytes::from_static(br#"{"a":1}"#));
    }

    #[test]
    fn test_unserializable_value_is_internal_error() {
        // Non-string map keys cannot be serialized as JSON.
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 1);

        let writer = Response::new(RecordingWriter::default())
            .send_json(map)
            .into_writer();
        assert_eq!(writer.heads.len(), 1);
        assert_eq!(writer.heads[0].0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(writer.bodies[0], Bytes::from_static(b"Internal Server Error"));
    }

    #[test]
    fn test_http_writer_into_response() {
        let writer = Response::new(HttpWriter::default())
            .set_status(StatusCode::NO_CONTENT)
            .send_text("")
            .into_writer();
        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }
}
