//! The logging facade.
//!
//! [`Logger`] offers four leveled operations and four context-aware variants.
//! The context-aware ones tag the record with the request's correlation
//! identifier: the message gains a `"[<id>] "` prefix and a `reqID` field is
//! appended.
//!
//! ```rust
//! use reqlog::{fields, Logger, LoggerConfig, MemorySink, RequestContext};
//!
//! let sink = MemorySink::new();
//! let logger = Logger::with_sink(LoggerConfig::default(), sink.clone()).unwrap();
//!
//! let ctx = RequestContext::with_correlation_id(7);
//! logger.info_ctx(&ctx, "cache warmed", fields!["entries" => 128]);
//!
//! let record = &sink.records()[0];
//! assert_eq!(record.message, "[7] cache warmed");
//! assert_eq!(record.field("reqID"), Some(&reqlog::Value::U64(7)));
//! ```

use std::io::{self, IsTerminal, Write};

use serde::Deserialize;

use crate::context::RequestContext;
use crate::error::Error;
use crate::record::{Field, Record};
use crate::severity::Severity;
use crate::sink::{Encoding, Sink, WriterSink};

// ── Configuration ─────────────────────────────────────────────────────────────

/// How a [`Logger`] is built. Fixed for the logger's lifetime.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    /// JSON lines when `true`, colorized console lines otherwise.
    pub structured_output: bool,
    /// Lowers the gate from INFO to DEBUG.
    pub verbose: bool,
}

impl LoggerConfig {
    pub const JSON_VAR: &'static str = "REQLOG_JSON";
    pub const VERBOSE_VAR: &'static str = "REQLOG_VERBOSE";

    /// Reads `REQLOG_JSON` and `REQLOG_VERBOSE`. Unset variables mean `false`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let flag = |key: &str| match lookup(key) {
            Some(raw) => parse_flag(key, &raw),
            None => Ok(false),
        };
        Ok(Self {
            structured_output: flag(Self::JSON_VAR)?,
            verbose: flag(Self::VERBOSE_VAR)?,
        })
    }

    /// The lowest severity that will be emitted.
    pub fn min_severity(&self) -> Severity {
        if self.verbose { Severity::Debug } else { Severity::Info }
    }

    pub fn encoding(&self) -> Encoding {
        if self.structured_output { Encoding::Json } else { Encoding::Console }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, Error> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"       => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _                                 => Err(Error::Config(format!("{key} must be a boolean, got `{raw}`"))),
    }
}

// ── Logger ────────────────────────────────────────────────────────────────────

/// Leveled, structured, context-aware logger.
///
/// Build one at startup and share it behind an `Arc`. Calls below the
/// configured minimum severity return before anything is formatted.
pub struct Logger {
    sink: Box<dyn Sink>,
    min_severity: Severity,
}

impl Logger {
    /// Logs to standard error, encoded per `config`. Console output is
    /// coloured when standard error is a terminal.
    pub fn new(config: LoggerConfig) -> Result<Self, Error> {
        let color = io::stderr().is_terminal();
        Self::with_sink(config, WriterSink::new(io::stderr(), config.encoding()).with_color(color))
    }

    /// Logs to `writer`, encoded per `config`, without colour.
    pub fn with_writer(
        config: LoggerConfig,
        writer: impl Write + Send + 'static,
    ) -> Result<Self, Error> {
        Self::with_sink(config, WriterSink::new(writer, config.encoding()))
    }

    /// Logs to a custom backend. `config.structured_output` is ignored; the
    /// sink decides how records are rendered.
    ///
    /// The sink is flushed once before the logger is handed out; a failing
    /// flush means the backend is unusable and is reported as an error.
    pub fn with_sink(config: LoggerConfig, sink: impl Sink + 'static) -> Result<Self, Error> {
        sink.flush()?;
        Ok(Self { sink: Box::new(sink), min_severity: config.min_severity() })
    }

    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }

    pub fn flush(&self) -> Result<(), Error> {
        Ok(self.sink.flush()?)
    }

    pub fn debug(&self, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit(Severity::Debug, msg, fields);
    }

    pub fn info(&self, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit(Severity::Info, msg, fields);
    }

    pub fn warn(&self, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit(Severity::Warn, msg, fields);
    }

    pub fn error(&self, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit(Severity::Error, msg, fields);
    }

    pub fn debug_ctx(&self, ctx: &RequestContext, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit_ctx(Severity::Debug, ctx, msg, fields);
    }

    pub fn info_ctx(&self, ctx: &RequestContext, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit_ctx(Severity::Info, ctx, msg, fields);
    }

    pub fn warn_ctx(&self, ctx: &RequestContext, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit_ctx(Severity::Warn, ctx, msg, fields);
    }

    pub fn error_ctx(&self, ctx: &RequestContext, msg: impl Into<String>, fields: Vec<Field>) {
        self.emit_ctx(Severity::Error, ctx, msg, fields);
    }

    /// A logger bound to `ctx`, for code that only has a severity tag.
    pub fn scoped<'a>(&'a self, ctx: &'a RequestContext) -> ContextLogger<'a> {
        ContextLogger { logger: self, ctx }
    }

    fn emit_ctx(
        &self,
        severity: Severity,
        ctx: &RequestContext,
        msg: impl Into<String>,
        fields: Vec<Field>,
    ) {
        // Gate before `correlate` so dropped records cost no formatting.
        if !self.enabled(severity) {
            return;
        }
        let (msg, fields) = correlate(ctx, msg.into(), fields);
        self.emit(severity, msg, fields);
    }

    fn emit(&self, severity: Severity, msg: impl Into<String>, fields: Vec<Field>) {
        if !self.enabled(severity) {
            return;
        }
        let record = Record::new(severity, msg.into(), fields);
        if let Err(e) = self.sink.write(&record) {
            tracing::error!(error = %e, "failed to write log record");
        }
    }
}

/// Adds the correlation identifier to a message and its fields, if the
/// context has one.
fn correlate(ctx: &RequestContext, msg: String, mut fields: Vec<Field>) -> (String, Vec<Field>) {
    match ctx.correlation_id() {
        Some(id) => {
            fields.push(Field::new("reqID", id));
            (format!("[{id}] {msg}"), fields)
        }
        None => (msg, fields),
    }
}

// ── ContextLogger ─────────────────────────────────────────────────────────────

/// A [`Logger`] bound to one [`RequestContext`].
///
/// ```rust
/// use reqlog::{fields, Logger, LoggerConfig, MemorySink, RequestContext, Severity};
///
/// let sink = MemorySink::new();
/// let logger = Logger::with_sink(LoggerConfig::default(), sink.clone()).unwrap();
/// let ctx = RequestContext::with_correlation_id(2);
///
/// let log = logger.scoped(&ctx);
/// log.log(Severity::Warn, "retrying upstream", fields!["attempt" => 2]);
///
/// assert_eq!(sink.records()[0].message, "[2] retrying upstream");
/// ```
#[derive(Clone, Copy)]
pub struct ContextLogger<'a> {
    logger: &'a Logger,
    ctx: &'a RequestContext,
}

impl ContextLogger<'_> {
    pub fn log(&self, severity: Severity, msg: impl Into<String>, fields: Vec<Field>) {
        match severity {
            Severity::Debug => self.logger.debug_ctx(self.ctx, msg, fields),
            Severity::Info  => self.logger.info_ctx(self.ctx, msg, fields),
            Severity::Warn  => self.logger.warn_ctx(self.ctx, msg, fields),
            Severity::Error => self.logger.error_ctx(self.ctx, msg, fields),
        }
    }

    pub fn context(&self) -> &RequestContext {
        self.ctx
    }
}
