//! # audio-bridge
//!
//! A small embedded HTTP/1.1 server that exposes system volume, mute, media
//! playback and audio device switching as a local JSON API, for home
//! automation hubs to drive.
//!
//! One request is served per TCP connection. Requests are routed by exact
//! method and path, and handlers reach the audio system only through the
//! traits in [`capability`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audio_bridge::capability::Capabilities;
//! use audio_bridge::router::Router;
//! use audio_bridge::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:8888").await?;
//!     println!("Listening on http://{}", server.local_addr());
//!     server.run(Router::new(Capabilities::in_memory())).await?;
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
pub mod handlers;
pub mod http;
pub mod router;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use capability::Capabilities;
pub use http::{Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
