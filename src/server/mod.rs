//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and serves exactly one HTTP/1.1 request per
//! connection. Socket I/O for many connections runs concurrently; handler
//! execution is serialized through a single dispatch queue (see
//! [`dispatch`]).

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::{DEFAULT_IDLE_TIMEOUT, ServerConfig};
use crate::router::Router;

mod connection;
mod dispatch;

use connection::Connection;
use dispatch::DispatchQueue;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// The control surface listener.
///
/// # Examples
///
/// ```rust,no_run
/// use audio_bridge::capability::Capabilities;
/// use audio_bridge::router::Router;
/// use audio_bridge::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8888").await?;
///     server.run(Router::new(Capabilities::in_memory())).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    idle_timeout: Option<Duration>,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        })
    }

    /// Binds using the host, port and timeout from `config`.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let server = Self::bind(config.addr()).await?;
        Ok(server.idle_timeout(config.idle_timeout))
    }

    /// Sets how long a connection may stay silent before it is dropped.
    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and serving them with `router`.
    ///
    /// The router moves onto the dispatch worker. This method runs until the
    /// process is terminated or the future is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the dispatch worker cannot be started.
    pub async fn run(self, router: Router) -> Result<(), ServerError> {
        let queue = DispatchQueue::start(router)?;
        info!(address = %self.local_addr, "audio bridge listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let connection = Connection::new(stream, peer_addr, queue.clone(), self.idle_timeout);
            tokio::spawn(connection.run());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        AudioDevice, Capabilities, CapabilityResult, DeviceControl, DeviceSelector, MemoryDevices,
        MemoryMedia, MemoryVolume,
    };
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn start(capabilities: Capabilities, idle_timeout: Option<Duration>) -> SocketAddr {
        let server = Server::bind("127.0.0.1:0")
            .await
            .unwrap()
            .idle_timeout(idle_timeout);
        let addr = server.local_addr();
        tokio::spawn(server.run(Router::new(capabilities)));
        addr
    }

    async fn exchange(addr: SocketAddr, raw: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    fn split(raw: &str) -> (u16, Value) {
        let (head, body) = raw.split_once("\r\n\r\n").expect("complete response");
        let status = head
            .split(' ')
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("status code");
        (status, serde_json::from_str(body).expect("json body"))
    }

    async fn call(addr: SocketAddr, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
        let raw = match body {
            Some(body) => {
                let body = body.to_string();
                format!(
                    "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                )
            }
            None => format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        };
        split(&exchange(addr, raw.as_bytes()).await)
    }

    struct PanickingDevices;

    impl DeviceControl for PanickingDevices {
        fn devices(&self) -> Vec<AudioDevice> {
            panic!("device enumeration crashed");
        }
        fn default_output(&self) -> Option<AudioDevice> {
            None
        }
        fn default_input(&self) -> Option<AudioDevice> {
            None
        }
        fn set_default_output(&mut self, _: &DeviceSelector) -> CapabilityResult<()> {
            Ok(())
        }
        fn set_default_input(&mut self, _: &DeviceSelector) -> CapabilityResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn volume_round_trips_over_the_wire() {
        let addr = start(Capabilities::in_memory(), None).await;
        for v in [0, 1, 29, 57, 99, 100] {
            let (status, body) = call(addr, "POST", "/api/volume", Some(json!({ "volume": v }))).await;
            assert_eq!(status, 200);
            assert_eq!(body, json!({ "success": true, "volume": v }));
            let (_, body) = call(addr, "GET", "/api/volume", None).await;
            assert_eq!(body["volume"], v);
        }
    }

    #[tokio::test]
    async fn invalid_volume_keeps_previous_value() {
        let addr = start(Capabilities::in_memory(), None).await;
        call(addr, "POST", "/api/volume", Some(json!({ "volume": 33 }))).await;
        for bad in [json!({ "volume": 150 }), json!({ "volume": -3 }), json!({ "volume": 12.5 })] {
            let (status, body) = call(addr, "POST", "/api/volume", Some(bad)).await;
            assert_eq!(status, 400);
            assert_eq!(body["error"], "Invalid volume value");
        }
        let (_, body) = call(addr, "GET", "/api/volume", None).await;
        assert_eq!(body["volume"], 33);
    }

    #[tokio::test]
    async fn mute_round_trips_over_the_wire() {
        let addr = start(Capabilities::in_memory(), None).await;
        call(addr, "POST", "/api/mute", Some(json!({ "muted": true }))).await;
        assert_eq!(call(addr, "GET", "/api/mute", None).await.1, json!({ "muted": true }));
        call(addr, "POST", "/api/mute", Some(json!({ "muted": false }))).await;
        assert_eq!(call(addr, "GET", "/api/mute", None).await.1, json!({ "muted": false }));
    }

    #[tokio::test]
    async fn response_framing() {
        let addr = start(Capabilities::in_memory(), None).await;
        let raw = exchange(addr, b"GET /api/status HTTP/1.1\r\n\r\n").await;
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Type: application/json"));
        assert!(head.contains("Access-Control-Allow-Origin: *"));
        assert!(head.contains("Connection: close"));
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
    }

    #[tokio::test]
    async fn unknown_route_is_404_with_listing() {
        let addr = start(Capabilities::in_memory(), None).await;
        let (status, body) = call(addr, "GET", "/api/nonexistent", None).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"], "Not found");
        assert!(!body["available_endpoints"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_request_line_is_400() {
        let addr = start(Capabilities::in_memory(), None).await;
        let cases: [&[u8]; 3] = [
            b"\r\n\r\n",
            b"GARBAGE\r\n\r\n",
            b"GET /\xff\xfe HTTP/1.1\r\n\r\n",
        ];
        for raw in cases {
            let (status, body) = split(&exchange(addr, raw).await);
            assert_eq!(status, 400);
            assert_eq!(body, json!({ "error": "Invalid request" }));
        }
    }

    #[tokio::test]
    async fn unavailable_audio_fails_everything() {
        let addr = start(
            Capabilities::new(
                None,
                Box::new(MemoryMedia::default()),
                Box::new(MemoryDevices::default()),
            ),
            None,
        )
        .await;
        for (method, path) in [
            ("GET", "/api/status"),
            ("GET", "/api/volume"),
            ("POST", "/api/media/play"),
            ("GET", "/api/audio/devices"),
            ("GET", "/api/nonexistent"),
        ] {
            let (status, body) = call(addr, method, path, None).await;
            assert_eq!(status, 500, "{method} {path}");
            assert_eq!(body, json!({ "error": "Audio system not available" }));
        }
    }

    #[tokio::test]
    async fn concurrent_clients_get_their_own_response() {
        let addr = start(Capabilities::in_memory(), None).await;
        let clients: Vec<_> = (0..32_u64)
            .map(|position| {
                tokio::spawn(async move {
                    let (status, body) = call(
                        addr,
                        "POST",
                        "/api/media/seek",
                        Some(json!({ "position": position })),
                    )
                    .await;
                    (position, status, body)
                })
            })
            .collect();

        for client in clients {
            let (position, status, body) = client.await.unwrap();
            assert_eq!(status, 200);
            assert_eq!(body, json!({ "success": true, "position": position }));
        }
    }

    #[tokio::test]
    async fn empty_connection_closes_silently() {
        let addr = start(Capabilities::in_memory(), None).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.shutdown().await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn idle_connection_is_dropped() {
        let addr = start(Capabilities::in_memory(), Some(Duration::from_millis(50))).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut out = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out)).await;
        assert!(read.is_ok(), "server kept the idle connection open");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn handler_panic_is_500_and_worker_survives() {
        let addr = start(
            Capabilities::new(
                Some(Box::new(MemoryVolume::default())),
                Box::new(MemoryMedia::default()),
                Box::new(PanickingDevices),
            ),
            None,
        )
        .await;

        let (status, _) = call(addr, "GET", "/api/volume", None).await;
        assert_eq!(status, 200);

        let (status, body) = call(addr, "GET", "/api/audio/devices", None).await;
        assert_eq!(status, 500);
        assert_eq!(body, json!({ "error": "Internal Server Error" }));

        for _ in 0..3 {
            let (status, body) = call(addr, "GET", "/api/volume", None).await;
            assert_eq!(status, 200);
            assert_eq!(body, json!({ "volume": 50 }));
        }
    }

    #[tokio::test]
    async fn late_body_is_not_awaited() {
        let addr = start(Capabilities::in_memory(), None).await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = stream.into_split();
        writer
            .write_all(b"POST /api/volume HTTP/1.1\r\nContent-Length: 14\r\n\r\n")
            .await
            .unwrap();
        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            // The server has usually closed by now.
            let _ = writer.write_all(br#"{"volume": 10}"#).await;
        });

        let mut out = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), reader.read_to_end(&mut out))
            .await
            .expect("server waited for the late body")
            .unwrap();
        late.await.unwrap();
        let (status, body) = split(&String::from_utf8(out).unwrap());
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Invalid volume value");

        let (_, body) = call(addr, "GET", "/api/volume", None).await;
        assert_eq!(body["volume"], 50);
    }

}
