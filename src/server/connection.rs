//! One accepted socket, driven through a single request/response cycle.
//!
//! ```text
//! Receiving ──► Routing(Request) ──► Responding(Response) ──► Closed
//!     │                                      ▲
//!     ├── malformed request ─────────────────┘
//!     └── EOF / I/O error / idle timeout ────────────────────► Closed
//! ```
//!
//! Known limitation: the first read that returns data is taken as the whole
//! request. `Content-Length` is not used for framing, so a body split across
//! TCP segments arrives truncated. Small local JSON requests fit in one
//! segment; a truncated body is logged and then fails handler validation.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::dispatch::DispatchQueue;
use crate::http::{Request, Response, StatusCode};

/// Most bytes taken from a single read.
pub(crate) const MAX_REQUEST_SIZE: usize = 64 * 1024;

enum State {
    Receiving,
    Routing(Request),
    Responding(Response),
    Closed,
}

pub(crate) struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    queue: DispatchQueue,
    idle_timeout: Option<Duration>,
    buf: BytesMut,
}

impl Connection {
    pub(crate) fn new(
        stream: TcpStream,
        peer: SocketAddr,
        queue: DispatchQueue,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            stream,
            peer,
            queue,
            idle_timeout,
            buf: BytesMut::with_capacity(MAX_REQUEST_SIZE),
        }
    }

    /// Runs the state machine to completion. The socket is dropped on return.
    pub(crate) async fn run(mut self) {
        let mut state = State::Receiving;
        loop {
            state = match state {
                State::Receiving => self.receive().await,
                State::Routing(request) => self.route(request).await,
                State::Responding(response) => {
                    self.respond(response).await;
                    State::Closed
                }
                State::Closed => break,
            };
        }
        debug!(peer = %self.peer, "connection closed");
    }

    async fn receive(&mut self) -> State {
        match self.read_some().await {
            Ok(0) => {
                debug!(peer = %self.peer, "peer closed before sending a request");
                State::Closed
            }
            Ok(_) => self.parse(),
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "receive failed");
                State::Closed
            }
        }
    }

    async fn read_some(&mut self) -> io::Result<usize> {
        let read = self.stream.read_buf(&mut self.buf);
        match self.idle_timeout {
            Some(limit) => timeout(limit, read).await?,
            None => read.await,
        }
    }

    fn parse(&self) -> State {
        match Request::parse(&self.buf) {
            Ok(request) => {
                if request.is_truncated() {
                    warn!(
                        peer = %self.peer,
                        declared = ?request.headers().content_length(),
                        received = request.received_body_len(),
                        "request body shorter than Content-Length; processing what arrived"
                    );
                }
                State::Routing(request)
            }
            Err(e) => {
                warn!(peer = %self.peer, error = %e, "bad request, sending 400");
                State::Responding(Response::error(StatusCode::BadRequest, "Invalid request"))
            }
        }
    }

    async fn route(&self, request: Request) -> State {
        debug!(
            peer = %self.peer,
            method = %request.method(),
            path = %request.path(),
            user_agent = request.headers().get("user-agent").unwrap_or("-"),
            "dispatching request"
        );
        match self.queue.dispatch(request).await {
            Some(response) => State::Responding(response),
            None => {
                error!(peer = %self.peer, "dispatch worker unavailable, dropping connection");
                State::Closed
            }
        }
    }

    async fn respond(&mut self, response: Response) {
        let status = response.status();
        let bytes = match response.into_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(peer = %self.peer, error = %e, "failed to encode response body");
                return;
            }
        };

        if let Err(e) = self.stream.write_all(&bytes).await {
            warn!(peer = %self.peer, error = %e, "send failed");
            return;
        }
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown after send failed");
        }
        debug!(peer = %self.peer, status = status.as_u16(), "response sent");
    }
}
