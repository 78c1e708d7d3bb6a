//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections, lets every
//! in-flight connection finish, then returns from [`Server::serve`]. Set
//! Kubernetes' `terminationGracePeriodSeconds` above your slowest request.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::context::RequestContext;
use crate::error::Error;
use crate::middleware::{RequestMeta, Trace};
use crate::request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: String,
    trace: Option<Trace>,
}

/// Router plus optional middleware, shared by every connection task.
struct App {
    router: Router,
    trace: Option<Trace>,
}

impl Server {
    /// Configures the server to bind to `addr` (`host:port`) when
    /// [`serve`](Server::serve) is called.
    ///
    /// ```rust,no_run
    /// use reqlog::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), trace: None }
    }

    /// Routes every request through `trace`: a correlation id per request,
    /// a start line and one completion line.
    pub fn trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns after a full graceful shutdown, or early with
    /// [`Error::Config`] if the bind address does not parse and
    /// [`Error::Io`] if it cannot be bound.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .map_err(|e| Error::Config(format!("invalid socket address `{}`: {e}", self.addr)))?;
        let listener = TcpListener::bind(addr).await?;

        let app = Arc::new(App { router, trace: self.trace });

        info!(addr = %addr, traced = app.trace.is_some(), "reqlog listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a SIGTERM stops accepting even while
                // connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr).await }
                        });

                        // HTTP/1.1 or HTTP/2, whichever the client speaks.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("reqlog stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads the body, then hands the request to [`respond`]. Never fails: every
/// outcome, including an unreadable body, is a status code.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(e) => {
            error!(peer = %remote_addr, "failed to read request body: {e}");
            None
        }
    };

    let response = respond(&app, parts, body, remote_addr).await;
    Ok(response.into_inner())
}

/// Routes one request, through the trace middleware when installed.
async fn respond(app: &App, parts: Parts, body: Option<Bytes>, remote_addr: SocketAddr) -> Response {
    let Some(trace) = &app.trace else {
        return route(&app.router, parts, body, RequestContext::new()).await;
    };

    let meta = RequestMeta::new(
        parts.method.as_str(),
        parts.uri.path(),
        request::client_ip(&parts.headers, remote_addr),
    );
    trace
        .around(meta, |ctx| route(&app.router, parts, body, ctx))
        .await
}

async fn route(router: &Router, parts: Parts, body: Option<Bytes>, ctx: RequestContext) -> Response {
    let Some(body) = body else {
        ctx.annotate("request body could not be read");
        return Response::status(StatusCode::BAD_REQUEST);
    };

    router.dispatch(parts, body, ctx).await
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). Only Ctrl-C on
/// non-Unix platforms.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
