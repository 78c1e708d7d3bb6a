//! # reqlog
//!
//! Request-scoped structured logging, and the minimal HTTP framework it runs
//! in.
//!
//! Every request gets a correlation id from a process-wide counter. Every log
//! line written through a context-aware call during that request is prefixed
//! with `[<id>]` and tagged `reqID=<id>`, so one `grep` pulls a request's
//! whole story out of the log. When the handler returns, exactly one
//! `Request served` line is written, at a severity chosen from the status:
//!
//! | Status | Severity |
//! |---|---|
//! | 200, 201, 301 | INFO |
//! | 404 | WARN |
//! | anything else | ERROR |
//!
//! What reqlog leaves to other tools: persistence, rotation and shipping of
//! log output, sampling, metrics.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqlog::{Logger, LoggerConfig, Request, Response, Router, Server, StatusCode, Trace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqlog::Error> {
//!     let logger = Arc::new(Logger::new(LoggerConfig::from_env()?)?);
//!
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000")
//!         .trace(Trace::new(logger))
//!         .serve(app)
//!         .await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         req.annotate("empty body");
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(b"{}".to_vec())
//! }
//! ```

mod context;
mod error;
mod handler;
mod logger;
mod record;
mod request;
mod response;
mod router;
mod server;
mod severity;
mod sink;

pub mod middleware;

pub use context::RequestContext;
pub use error::Error;
pub use handler::{Handler, HandlerFuture};
pub use http::{Method, StatusCode};
pub use logger::{ContextLogger, Logger, LoggerConfig};
pub use middleware::{RequestCounter, RequestMeta, Trace, classify};
pub use record::{Field, Record, Value};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use severity::Severity;
pub use sink::{Encoding, MemorySink, RESERVED_KEYS, Sink, WriterSink};
