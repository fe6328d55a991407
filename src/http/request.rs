//! HTTP/1.1 request parsing.
//!
//! The control surface only ever needs the request line and, for `POST`, a
//! small JSON object body. Parsing is lenient past the request
//! line: headers are extracted best-effort with [`httparse`] and a body that
//! is not a JSON object is dropped rather than rejected, so that handlers can
//! report the missing field themselves.

use std::str;

use serde_json::{Map, Value};
use thiserror::Error;

use super::{Headers, Method};

/// Errors that stop a request before it reaches the router.
///
/// Both variants are answered with `400 Bad Request`.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] str::Utf8Error),

    #[error("malformed request line: {line:?}")]
    MalformedRequestLine { line: String },
}

/// A JSON object request body.
pub type JsonBody = Map<String, Value>;

/// A parsed request.
///
/// # Examples
///
/// ```
/// use audio_bridge::http::{Method, Request};
///
/// let raw = b"POST /api/volume HTTP/1.1\r\nHost: localhost\r\n\r\n{\"volume\": 40}";
/// let request = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method(), &Method::Post);
/// assert_eq!(request.path(), "/api/volume");
/// assert_eq!(request.field("volume").and_then(|v| v.as_i64()), Some(40));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    headers: Headers,
    body: Option<JsonBody>,
    received_body_len: usize,
}

impl Request {
    const MAX_HEADERS: usize = 64;

    /// Creates a request with no headers and no body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Headers::new(),
            body: None,
            received_body_len: 0,
        }
    }

    /// Attaches a JSON object body.
    #[must_use]
    pub fn with_body(mut self, body: JsonBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Parses everything received on a connection.
    ///
    /// The request line is split on single spaces and must yield at least a
    /// method and a path; the HTTP version token is not checked. For `POST`,
    /// the text after the first blank line becomes the body if it decodes as
    /// a JSON object. Other methods never carry a body.
    ///
    /// # Errors
    ///
    /// - [`RequestError::InvalidUtf8`]: the buffer is not UTF-8 text.
    /// - [`RequestError::MalformedRequestLine`]: fewer than two tokens on the first line.
    pub fn parse(buf: &[u8]) -> Result<Self, RequestError> {
        let text = str::from_utf8(buf)?;

        let request_line = text.split("\r\n").next().unwrap_or_default();
        let mut tokens = request_line.split(' ');
        let (Some(method), Some(path)) = (tokens.next(), tokens.next()) else {
            return Err(RequestError::MalformedRequestLine {
                line: request_line.to_owned(),
            });
        };
        let Ok(method) = method.parse::<Method>();

        let head_end = text.find("\r\n\r\n");
        let headers = match (text.find("\r\n"), head_end) {
            (Some(line_end), Some(head_end)) => {
                parse_headers(&text.as_bytes()[line_end + 2..head_end + 4])
            }
            _ => Headers::new(),
        };

        let raw_body = head_end.map(|i| &text[i + 4..]).unwrap_or_default();
        let body = if method == Method::Post {
            parse_json_object(raw_body)
        } else {
            None
        };

        Ok(Self {
            method,
            path: path.to_owned(),
            headers,
            body,
            received_body_len: raw_body.len(),
        })
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path exactly as sent.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the best-effort parsed headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the JSON object body, if one was sent and decoded.
    pub fn body(&self) -> Option<&JsonBody> {
        self.body.as_ref()
    }

    /// Returns a top-level body field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.as_ref()?.get(name)
    }

    /// Number of bytes received after the header block.
    pub fn received_body_len(&self) -> usize {
        self.received_body_len
    }

    /// Returns `true` when `Content-Length` promises more body than arrived.
    ///
    /// Bodies are never awaited past the first read, so this only feeds a
    /// diagnostic.
    pub fn is_truncated(&self) -> bool {
        self.headers
            .content_length()
            .is_some_and(|declared| declared > self.received_body_len)
    }
}

fn parse_headers(block: &[u8]) -> Headers {
    let mut raw = [httparse::EMPTY_HEADER; Request::MAX_HEADERS];
    match httparse::parse_headers(block, &mut raw) {
        Ok(httparse::Status::Complete((_, parsed))) => Headers::from_parsed(parsed),
        _ => Headers::new(),
    }
}

fn parse_json_object(raw: &str) -> Option<JsonBody> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
