//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method};

use crate::context::RequestContext;

/// An incoming HTTP request with its body fully read.
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
    context: RequestContext,
}

impl Request {
    pub(crate) fn new(
        parts: Parts,
        body: Bytes,
        params: HashMap<String, String>,
        context: RequestContext,
    ) -> Self {
        Self { parts, body, params, context }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The request's logging context. Carries the correlation id when the
    /// trace middleware is installed.
    pub fn context(&self) -> &RequestContext { &self.context }

    /// Shorthand for `req.context().annotate(note)`.
    pub fn annotate(&self, note: impl Into<String>) {
        self.context.annotate(note);
    }
}

/// Client address as seen through a reverse proxy.
///
/// First entry of `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    match forwarded.or_else(real_ip) {
        Some(ip) => ip.to_owned(),
        None => peer.ip().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.10:51234".parse().unwrap()
    }

    #[test]
    fn falls_back_to_peer_address() {
        assert_eq!(client_ip(&HeaderMap::new(), peer()), "192.0.2.10");
    }

    #[test]
    fn prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        assert_eq!(client_ip(&headers, peer()), "203.0.113.5");
    }

    #[test]
    fn uses_real_ip_without_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static(" 198.51.100.4 "));
        assert_eq!(client_ip(&headers, peer()), "198.51.100.4");
    }

    #[test]
    fn accessors_read_parts_and_params() {
        let (parts, ()) = http::Request::builder()
            .method(Method::PUT)
            .uri("/users/42?x=1")
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();
        let params = HashMap::from([("id".to_owned(), "42".to_owned())]);
        let req = Request::new(parts, Bytes::from_static(b"{}"), params, RequestContext::new());

        assert_eq!(req.method(), Method::PUT);
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.param("id"), Some("42"));
        assert_eq!(req.body(), b"{}");

        req.annotate("note");
        assert_eq!(req.context().annotations(), ["note"]);
    }
}
