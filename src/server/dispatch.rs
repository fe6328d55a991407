//! The serial dispatch queue.
//!
//! Connection tasks do their socket I/O concurrently, but every parsed
//! request is handed to one dedicated worker thread that owns the
//! [`Router`]. Handlers therefore run one at a time, in arrival order, and
//! the capabilities are never touched from two places at once.
//!
//! A panicking handler is answered with a `500` and the worker keeps
//! serving; it never takes the queue down with it.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::http::{Request, Response, StatusCode};
use crate::router::Router;

/// Requests that may wait for the worker before senders are back-pressured.
const QUEUE_DEPTH: usize = 256;

struct Job {
    request: Request,
    reply: oneshot::Sender<Response>,
}

fn dispatch_guarded(router: &mut Router, request: &Request) -> Response {
    panic::catch_unwind(AssertUnwindSafe(|| router.dispatch(request))).unwrap_or_else(|_| {
        error!(method = %request.method(), path = %request.path(), "handler panicked");
        Response::error(StatusCode::InternalServerError, "Internal Server Error")
    })
}

/// Cloneable handle used by connection tasks to submit requests.
#[derive(Clone)]
pub(crate) struct DispatchQueue {
    jobs: mpsc::Sender<Job>,
}

impl DispatchQueue {
    /// Moves `router` onto a new worker thread.
    ///
    /// The worker exits once every handle has been dropped.
    pub(crate) fn start(mut router: Router) -> io::Result<Self> {
        let (jobs, mut pending) = mpsc::channel::<Job>(QUEUE_DEPTH);

        thread::Builder::new()
            .name("audio-bridge-dispatch".to_owned())
            .spawn(move || {
                while let Some(job) = pending.blocking_recv() {
                    let response = dispatch_guarded(&mut router, &job.request);
                    if job.reply.send(response).is_err() {
                        debug!(path = %job.request.path(), "client gone before response was ready");
                    }
                }
                debug!("dispatch worker stopped");
            })?;

        Ok(Self { jobs })
    }

    /// Runs `request` through the router.
    ///
    /// Returns `None` only if the worker is gone.
    pub(crate) async fn dispatch(&self, request: Request) -> Option<Response> {
        let (reply, response) = oneshot::channel();
        self.jobs.send(Job { request, reply }).await.ok()?;
        response.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capabilities;
    use crate::http::Method;

    #[tokio::test]
    async fn requests_share_one_router() {
        let queue = DispatchQueue::start(Router::new(Capabilities::in_memory())).unwrap();

        let mut body = serde_json::Map::new();
        body.insert("muted".to_owned(), true.into());
        let set = Request::new(Method::Post, "/api/mute").with_body(body);
        let response = queue.dispatch(set).await.unwrap();
        assert_eq!(response.status(), StatusCode::Ok);

        let response = queue
            .clone()
            .dispatch(Request::new(Method::Get, "/api/mute"))
            .await
            .unwrap();
        assert_eq!(response.body()["muted"], true);
    }
}
