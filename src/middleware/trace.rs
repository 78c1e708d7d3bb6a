//! Per-request tracing: correlation identifiers, start and completion lines.
//!
//! Every request handled through [`Trace`] gets:
//!
//! 1. the next value of a shared [`RequestCounter`] as its correlation id,
//! 2. a DEBUG `"Incoming request: <path>"` line,
//! 3. exactly one `"Request served"` line once the handler has returned, at a
//!    severity picked by [`classify`] from the final status code.
//!
//! The completion line carries `path`, `comment`, `latency`, `clientIP`,
//! `method` and `statusCode`, in that order, followed by `reqID`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::context::RequestContext;
use crate::fields;
use crate::logger::Logger;
use crate::response::Response;
use crate::severity::Severity;

// ── RequestCounter ────────────────────────────────────────────────────────────

/// Source of correlation identifiers. Starts at 0; the first id handed out
/// is 1. Never reset.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the new value. Concurrent callers always get
    /// distinct values.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued id, or 0 if none has been.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Severity of a completion line for a given status code.
///
/// `200`, `201` and `301` are INFO, `404` is WARN and every other code,
/// including the rest of 2xx and 3xx, is ERROR.
pub fn classify(status: u16) -> Severity {
    match status {
        200 | 201 | 301 => Severity::Info,
        404             => Severity::Warn,
        _               => Severity::Error,
    }
}

// ── RequestMeta ───────────────────────────────────────────────────────────────

/// What the host knows about a request before handing it downstream.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub client_ip: String,
}

impl RequestMeta {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        client_ip: impl Into<String>,
    ) -> Self {
        Self { method: method.into(), path: path.into(), client_ip: client_ip.into() }
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────────

/// Request-lifecycle logging middleware.
///
/// Install it on a [`Server`](crate::Server) with
/// [`Server::trace`](crate::Server::trace), or drive it directly from another
/// host with [`Trace::around`].
#[derive(Clone)]
pub struct Trace {
    logger: Arc<Logger>,
    counter: Arc<RequestCounter>,
}

impl Trace {
    /// A middleware with its own counter, starting at 0.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self::with_counter(logger, Arc::new(RequestCounter::new()))
    }

    /// A middleware drawing ids from `counter`, e.g. one shared with a
    /// second listener so ids stay unique across both.
    pub fn with_counter(logger: Arc<Logger>, counter: Arc<RequestCounter>) -> Self {
        Self { logger, counter }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn counter(&self) -> &Arc<RequestCounter> {
        &self.counter
    }

    /// Runs `next` for one request, logging around it.
    ///
    /// `next` receives the request's context; annotations it attaches show
    /// up in the completion line's `comment`. Control only comes back here
    /// once `next` has produced the response.
    pub async fn around<F, Fut>(&self, meta: RequestMeta, next: F) -> Response
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Response>,
    {
        let ctx = RequestContext::with_correlation_id(self.counter.next());

        self.logger.debug_ctx(&ctx, format!("Incoming request: {}", meta.path), fields![]);
        let start = Instant::now();

        let response = next(ctx.clone()).await;

        let latency = start.elapsed();
        let status = response.status_code().as_u16();
        let RequestMeta { method, path, client_ip } = meta;
        let fields = fields![
            "path"       => path,
            "comment"    => ctx.comment(),
            "latency"    => latency,
            "clientIP"   => client_ip,
            "method"     => method,
            "statusCode" => status,
        ];

        self.logger.scoped(&ctx).log(classify(status), "Request served", fields);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::LoggerConfig;
    use crate::record::Value;
    use crate::sink::MemorySink;
    use http::StatusCode;

    fn trace(verbose: bool) -> (Trace, MemorySink) {
        let sink = MemorySink::new();
        let config = LoggerConfig { verbose, ..LoggerConfig::default() };
        let logger = Logger::with_sink(config, sink.clone()).unwrap();
        (Trace::new(Arc::new(logger)), sink)
    }

    #[test]
    fn classification_table() {
        assert_eq!(classify(200), Severity::Info);
        assert_eq!(classify(201), Severity::Info);
        assert_eq!(classify(301), Severity::Info);
        assert_eq!(classify(404), Severity::Warn);
        for status in [100, 202, 204, 302, 304, 400, 401, 403, 405, 418, 500, 502, 503, 599] {
            assert_eq!(classify(status), Severity::Error, "status {status}");
        }
    }

    #[test]
    fn sequential_ids_have_no_gaps() {
        let counter = RequestCounter::new();
        assert_eq!(counter.current(), 0);
        let ids: Vec<_> = (0..5).map(|_| counter.next()).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
        assert_eq!(counter.current(), 5);
    }

    #[test]
    fn concurrent_ids_are_distinct() {
        let counter = Arc::new(RequestCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || (0..1000).map(|_| counter.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8000);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&8000));
    }

    #[tokio::test]
    async fn completion_fields_are_in_order() {
        let (trace, sink) = trace(false);
        let meta = RequestMeta::new("POST", "/orders", "10.0.0.7");
        trace
            .around(meta, |ctx| async move {
                ctx.annotate("inventory lookup degraded");
                Response::status(StatusCode::CREATED)
            })
            .await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(record.message, "[1] Request served");

        let keys: Vec<_> = record.fields.iter().map(|f| f.key.as_ref()).collect();
        assert_eq!(keys, ["path", "comment", "latency", "clientIP", "method", "statusCode", "reqID"]);
        assert_eq!(record.field("comment"), Some(&Value::from("Error #01: inventory lookup degraded")));
        assert_eq!(record.field("clientIP"), Some(&Value::from("10.0.0.7")));
        assert_eq!(record.field("method"), Some(&Value::from("POST")));
        assert_eq!(record.field("statusCode"), Some(&Value::U64(201)));
        assert!(matches!(record.field("latency"), Some(Value::Duration(_))));
    }

    #[tokio::test]
    async fn verbose_start_line_precedes_completion() {
        let (trace, sink) = trace(true);
        trace
            .around(RequestMeta::new("GET", "/slow", "127.0.0.1"), |_| async {
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            })
            .await;

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].severity, Severity::Debug);
        assert_eq!(records[0].message, "[1] Incoming request: /slow");
        assert_eq!(records[0].fields, fields!["reqID" => 1u64]);
        assert_eq!(records[1].severity, Severity::Error);
    }

    #[tokio::test]
    async fn handler_sees_the_assigned_id() {
        let (trace, _sink) = trace(false);
        trace.counter().next();
        trace.counter().next();

        let seen = Arc::new(AtomicU64::new(0));
        let seen_in_handler = Arc::clone(&seen);
        trace
            .around(RequestMeta::new("GET", "/", "::1"), move |ctx| async move {
                seen_in_handler.store(ctx.correlation_id().unwrap_or(0), Ordering::SeqCst);
                Response::text("ok")
            })
            .await;

        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
