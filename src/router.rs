//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::context::RequestContext;
use crate::handler::{Handler, Matched};
use crate::response::Response;

/// The application router. Build it once at startup and pass it to
/// [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Arc<dyn Handler>>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers a handler for a method + path pair. Path parameters use
    /// `{name}` syntax:
    ///
    /// ```rust,no_run
    /// # use reqlog::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn purge(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .get("/users/{id}", get_user)
    ///     .on(Method::from_bytes(b"PURGE").unwrap(), "/cache/{*key}", purge);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, Arc::new(handler) as Arc<dyn Handler>)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, path, handler)
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<Matched> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some(Matched { handler: Arc::clone(matched.value), params })
    }

    /// Routes one request under `ctx`. Unmatched method/path pairs answer
    /// `404 Not Found`.
    pub(crate) async fn dispatch(&self, parts: Parts, body: Bytes, ctx: RequestContext) -> Response {
        match self.lookup(&parts.method, parts.uri.path()) {
            Some(matched) => matched.invoke(parts, body, ctx).await,
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
