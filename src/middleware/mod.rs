//! Middleware layer.
//!
//! Middleware wraps request handling for cross-cutting concerns. The one
//! built-in piece is [`trace`]: correlation-id injection plus a start and a
//! completion line per request, routed to a severity by status code.

pub mod trace;

pub use trace::{RequestCounter, RequestMeta, Trace, classify};
