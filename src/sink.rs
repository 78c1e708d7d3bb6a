//! Log backends.
//!
//! A [`Sink`] receives fully-built [`Record`]s and renders them somewhere.
//! The [`Logger`](crate::Logger) owns exactly one sink and never exposes it.
//!
//! | Sink | Output |
//! |---|---|
//! | [`WriterSink`] | One line per record on any `io::Write`, JSON or console |
//! | [`MemorySink`] | Records kept in memory, for tests and embedding |

use std::io::{self, Write};
use std::sync::Arc;

use colored::{ColoredString, Colorize};
use parking_lot::Mutex;

use crate::record::Record;
use crate::severity::Severity;

/// Receives records from the logger.
///
/// Called concurrently from every request task; implementations must emit
/// each record as one unit.
pub trait Sink: Send + Sync {
    fn write(&self, record: &Record) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Keys every JSON line starts with. A record field with one of these names
/// is written as `_<name>` so it cannot overwrite the header.
pub const RESERVED_KEYS: [&str; 3] = ["level", "ts", "msg"];

/// Line format used by [`WriterSink`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    /// One JSON object per line: `level`, `ts`, `msg`, then the fields.
    Json,
    /// Tab-separated: time, level, message, fields as a trailing JSON object.
    Console,
}

impl Encoding {
    /// Renders `record` into `buf` without colour, newline included.
    pub fn encode(self, record: &Record, buf: &mut Vec<u8>) -> io::Result<()> {
        self.render(record, false, buf)
    }

    fn render(self, record: &Record, color: bool, buf: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Self::Json => {
                let mut line = serde_json::Map::with_capacity(record.fields.len() + 3);
                line.insert("level".into(), record.severity.as_lowercase().into());
                line.insert("ts".into(), record.timestamp().into());
                line.insert("msg".into(), record.message.clone().into());
                for (key, value) in record.fields_json() {
                    if RESERVED_KEYS.contains(&key.as_str()) {
                        line.insert(format!("_{key}"), value);
                    } else {
                        line.insert(key, value);
                    }
                }
                serde_json::to_writer(&mut *buf, &line)?;
            }
            Self::Console => {
                let label = record.severity.as_str();
                if color {
                    write!(buf, "{}\t{}\t", record.timestamp(), colored_level(record.severity))?;
                } else {
                    write!(buf, "{}\t{label}\t", record.timestamp())?;
                }
                buf.extend_from_slice(record.message.as_bytes());
                if !record.fields.is_empty() {
                    buf.push(b'\t');
                    serde_json::to_writer(&mut *buf, &record.fields_json())?;
                }
            }
        }
        buf.push(b'\n');
        Ok(())
    }
}

fn colored_level(severity: Severity) -> ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::Debug => label.magenta(),
        Severity::Info  => label.blue(),
        Severity::Warn  => label.yellow(),
        Severity::Error => label.red(),
    }
}

// ── WriterSink ────────────────────────────────────────────────────────────────

/// Encodes records onto a writer, one `write_all` per record.
///
/// The line is rendered outside the lock; the lock only covers the write, so
/// concurrent requests never interleave partial lines.
///
/// Console output is plain unless [`with_color`](WriterSink::with_color) is
/// set: only the caller knows whether the writer is a terminal.
pub struct WriterSink {
    writer: Mutex<Box<dyn Write + Send>>,
    encoding: Encoding,
    color: bool,
}

impl WriterSink {
    pub fn new(writer: impl Write + Send + 'static, encoding: Encoding) -> Self {
        Self { writer: Mutex::new(Box::new(writer)), encoding, color: false }
    }

    /// Colours console level labels. Ignored for JSON. `NO_COLOR` and
    /// `CLICOLOR=0` still win.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn is_colored(&self) -> bool {
        self.color && self.encoding == Encoding::Console
    }
}

impl Sink for WriterSink {
    fn write(&self, record: &Record) -> io::Result<()> {
        let mut line = Vec::with_capacity(256);
        self.encoding.render(record, self.color, &mut line)?;
        self.writer.lock().write_all(&line)
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

// ── MemorySink ────────────────────────────────────────────────────────────────

/// Keeps every record it receives. Clones share the same buffer, so keep one
/// handle and give the other to the logger.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far, in emission order.
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&self, record: &Record) -> io::Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
