//! Request routing: map an exact method and path to a handler.
//!
//! The route table is built once in [`Router::new`] and never changes while
//! serving. Matching is exact: no patterns, no trailing-slash normalization,
//! no query-string stripping.
//!
//! Requests that match nothing get a `404` whose body lists every endpoint,
//! grouped by area, so the API documents itself.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::capability::Capabilities;
use crate::handlers::{ApiError, Handler, devices, media, volume};
use crate::http::{Method, Request, Response, StatusCode};

/// Endpoint listing returned with every `404`, grouped by area.
///
/// Kept in step with the table in [`Router::new`]; a unit test checks both
/// directions.
pub const ENDPOINT_CATALOG: &[(&str, &[&str])] = &[
    (
        "Volume Control",
        &[
            "GET /api/status",
            "GET /api/volume",
            "POST /api/volume",
            "GET /api/mute",
            "POST /api/mute",
        ],
    ),
    (
        "Media Control",
        &[
            "POST /api/media/play_pause",
            "POST /api/media/play",
            "POST /api/media/pause",
            "POST /api/media/stop",
            "POST /api/media/next",
            "POST /api/media/previous",
            "GET /api/media/state",
            "GET /api/media/info",
            "POST /api/media/seek",
            "POST /api/media/shuffle",
            "POST /api/media/repeat",
        ],
    ),
    (
        "Audio Devices",
        &[
            "GET /api/audio/devices",
            "GET /api/audio/output",
            "POST /api/audio/output",
            "GET /api/audio/input",
            "POST /api/audio/input",
        ],
    ),
];

// A single registered route binding a method + path to a handler.
struct Route {
    method: Method,
    path: &'static str,
    handler: Handler,
}

/// Owns the route table and the capabilities the handlers drive.
///
/// `dispatch` takes `&mut self`: the router lives on the single dispatch
/// worker, so capabilities are mutated without locks.
///
/// # Examples
///
/// ```
/// use audio_bridge::capability::Capabilities;
/// use audio_bridge::http::{Method, Request, StatusCode};
/// use audio_bridge::router::Router;
///
/// let mut router = Router::new(Capabilities::in_memory());
/// let response = router.dispatch(&Request::new(Method::Get, "/api/volume"));
/// assert_eq!(response.status(), StatusCode::Ok);
/// ```
pub struct Router {
    routes: Vec<Route>,
    capabilities: Capabilities,
}

impl Router {
    /// Builds the router with the full endpoint table.
    pub fn new(capabilities: Capabilities) -> Self {
        let mut router = Self {
            routes: Vec::with_capacity(24),
            capabilities,
        };

        router.get("/api/status", volume::status);
        router.get("/api/volume", volume::get_volume);
        router.post("/api/volume", volume::set_volume);
        router.get("/api/mute", volume::get_mute);
        router.post("/api/mute", volume::set_mute);

        router.post("/api/media/play_pause", media::play_pause);
        router.post("/api/media/play", media::play);
        router.post("/api/media/pause", media::pause);
        router.post("/api/media/stop", media::stop);
        router.post("/api/media/next", media::next);
        router.post("/api/media/previous", media::previous);
        router.get("/api/media/state", media::state);
        router.get("/api/media/info", media::info);
        router.post("/api/media/seek", media::seek);
        router.post("/api/media/shuffle", media::shuffle);
        router.post("/api/media/repeat", media::repeat);

        router.get("/api/audio/devices", devices::list);
        router.get("/api/audio/output", devices::get_output);
        router.post("/api/audio/output", devices::set_output);
        router.get("/api/audio/input", devices::get_input);
        router.post("/api/audio/input", devices::set_input);

        router
    }

    fn get(&mut self, path: &'static str, handler: Handler) {
        self.add_route(Method::Get, path, handler);
    }

    fn post(&mut self, path: &'static str, handler: Handler) {
        self.add_route(Method::Post, path, handler);
    }

    fn add_route(&mut self, method: Method, path: &'static str, handler: Handler) {
        self.routes.push(Route {
            method,
            path,
            handler,
        });
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates over the table as `"METHOD /path"` strings.
    pub fn endpoints(&self) -> impl Iterator<Item = String> + '_ {
        self.routes
            .iter()
            .map(|route| format!("{} {}", route.method, route.path))
    }

    /// Routes `request` and returns exactly one response.
    ///
    /// When the volume capability is missing, every request gets
    /// `500 Audio system not available`, including unknown paths.
    pub fn dispatch(&mut self, request: &Request) -> Response {
        if self.capabilities.volume.is_none() {
            return ApiError::AudioUnavailable.into();
        }

        let route = self
            .routes
            .iter()
            .find(|route| route.method == *request.method() && route.path == request.path());

        let Some(route) = route else {
            debug!(method = %request.method(), path = %request.path(), "no route");
            return not_found();
        };

        match (route.handler)(&mut self.capabilities, request) {
            Ok(response) => response,
            Err(err) => {
                debug!(path = %request.path(), error = %err, "handler rejected request");
                err.into()
            }
        }
    }
}

/// The self-documenting `404` response.
pub fn not_found() -> Response {
    let endpoints: Map<String, Value> = ENDPOINT_CATALOG
        .iter()
        .map(|(area, routes)| ((*area).to_owned(), json!(routes)))
        .collect();

    Response::new(
        StatusCode::NotFound,
        json!({
            "error": "Not found",
            "available_endpoints": endpoints,
        }),
    )
}
