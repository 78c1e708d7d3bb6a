//! Request handlers.
//!
//! A [`Handler`] turns a [`Request`] into a [`HandlerFuture`]. Plain async
//! functions and closures get it through the blanket impl; types that carry
//! state, such as a shared [`Logger`](crate::Logger), can implement it
//! directly:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqlog::{fields, Handler, HandlerFuture, Logger, Request, Response, Severity};
//!
//! struct Audit {
//!     logger: Arc<Logger>,
//! }
//!
//! impl Handler for Audit {
//!     fn call(&self, req: Request) -> HandlerFuture {
//!         let logger = Arc::clone(&self.logger);
//!         Box::pin(async move {
//!             logger.scoped(req.context()).log(Severity::Info, "audit", fields!["path" => req.path()]);
//!             Response::text("recorded")
//!         })
//!     }
//! }
//! ```
//!
//! The router stores every handler as `Arc<dyn Handler>`; one virtual call
//! and one boxed future per request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The future a handler returns. `Send + 'static` so tokio can move it
/// between workers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Something that answers requests.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = impl IntoResponse>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> HandlerFuture;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> HandlerFuture {
        let fut = self(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

/// A registered handler plus the path parameters it matched with.
pub(crate) struct Matched {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) params: std::collections::HashMap<String, String>,
}

impl Matched {
    /// Runs the handler under `ctx`. The context is the one the trace
    /// middleware created for this request, so everything the handler logs
    /// through it carries the request's correlation id.
    pub(crate) fn invoke(
        self,
        parts: http::request::Parts,
        body: bytes::Bytes,
        ctx: RequestContext,
    ) -> HandlerFuture {
        self.handler.call(Request::new(parts, body, self.params, ctx))
    }
}
