//! HTTP server and graceful shutdown.
//!
//! [`Server::serve`] stops on SIGTERM or Ctrl-C; [`Server::serve_with_shutdown`]
//! stops when a future of your choosing resolves. Either way the listener is
//! closed first, every connection already accepted is allowed to finish, and
//! only then does the call return. Behind a reverse proxy that is what lets a
//! rolling restart drop no requests: the proxy stops routing to the old
//! process, which finishes what it has and exits.
//!
//! Each request runs inside its own filter record scope, so
//! [`get_filters_before_run`](crate::filter::get_filters_before_run) called
//! from a filter or view only ever sees the current request.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::filter::record;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Serves `router` until SIGTERM or Ctrl-C, then drains.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Serves `router` until `signal` resolves, then drains.
    ///
    /// Returns only after every accepted connection has closed.
    pub async fn serve_with_shutdown<S>(self, router: Router, signal: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        info!(addr = %self.addr, "strainer listening");

        // One task per connection. Keeping them in a set, rather than
        // detaching them, is what lets shutdown wait for them.
        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Poll the arms in order instead of at random: once the
                // signal has fired no further connection is accepted, even if
                // more are already queued on the listener.
                biased;

                () = &mut signal => {
                    info!(in_flight = connections.len(), "shutdown signal received, draining connections");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => spawn_connection(&mut connections, &router, stream, peer),
                    // Usually a transient resource limit (EMFILE and the
                    // like); the listener itself is still good.
                    Err(e) => warn!("accept error: {e}"),
                },

                // A JoinSet keeps every finished task's output until it is
                // joined. Reaping here stops it from growing for as long as
                // the server is up.
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        error!("connection task failed: {e}");
                    }
                }
            }
        }

        // The listener is dropped here; drain what was accepted before.
        drop(listener);
        while connections.join_next().await.is_some() {}

        info!("strainer stopped");
        Ok(())
    }
}

/// Serves every request on one connection.
fn spawn_connection(
    connections: &mut JoinSet<()>,
    router: &Arc<Router>,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let router = Arc::clone(router);
    connections.spawn(async move {
        // Called once per request, not once per connection: a keep-alive or
        // HTTP/2 connection carries many.
        let svc = service_fn(move |req| serve_one(Arc::clone(&router), req));

        // `auto` speaks HTTP/1.1 or HTTP/2, whichever the client opens with.
        // `TokioIo` adapts tokio's socket to hyper's IO traits.
        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
            .serve_connection(TokioIo::new(stream), svc)
            .await
        {
            debug!(%peer, "connection closed with error: {e}");
        }
    });
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Collects one request, runs it through the router in a fresh record scope,
/// and converts the result for hyper.
///
/// The error type is `Infallible`: an unreadable body answers `400`, a failing
/// filter chain `500`, and hyper never sees an error of ours.
async fn serve_one(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(path = parts.uri.path(), "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let req = Request::from_parts(parts, body);
    let head = req.share_head();

    let (response, record) = record::scope_async(router.dispatch(req)).await;
    debug!(
        method = %head.method(),
        path = head.path(),
        status = response.status_code().as_u16(),
        before = ?record.before(),
        after = ?record.after(),
        "request served",
    );

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (what orchestrators send to stop a process)
/// or SIGINT (Ctrl-C). Only Ctrl-C exists off Unix.
///
/// A signal that cannot be installed is logged and never fires, so the server
/// keeps running on the other one.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}
