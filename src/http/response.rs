//! HTTP/1.1 JSON response serialization.
//!
//! Every response carries the same fixed header block: JSON content type,
//! exact `Content-Length`, allow-all CORS, and `Connection: close`.

use bytes::{BufMut, BytesMut};
use serde_json::{Value, json};

use super::StatusCode;

/// A status code paired with a JSON body.
///
/// # Examples
///
/// ```
/// use audio_bridge::http::Response;
/// use serde_json::json;
///
/// let response = Response::ok(json!({ "volume": 42 }));
///
/// let bytes = response.into_bytes().unwrap();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Connection: close\r\n"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    body: Value,
}

impl Response {
    /// Creates a response with the given status and body.
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with the given body.
    pub fn ok(body: Value) -> Self {
        Self::new(StatusCode::Ok, body)
    }

    /// A response whose body is `{"error": message}`.
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::new(status, json!({ "error": message }))
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the JSON body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// The body is pretty-printed JSON; `Content-Length` is its exact byte
    /// length.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if the body cannot be serialized. Callers
    /// close the connection instead of sending partial output.
    pub fn into_bytes(self) -> Result<BytesMut, serde_json::Error> {
        let body = serde_json::to_vec_pretty(&self.body)?;

        let head = format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Access-Control-Allow-Origin: *\r\n\
             Connection: close\r\n\
             \r\n",
            self.status.as_u16(),
            self.status.canonical_reason(),
            body.len(),
        );

        let mut buf = BytesMut::with_capacity(head.len() + body.len());
        buf.put(head.as_bytes());
        buf.put(body.as_slice());
        Ok(buf)
    }
}
