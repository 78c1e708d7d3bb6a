//! Unified error type.

use std::fmt;

/// The error type returned by reqlog's fallible operations.
///
/// Request outcomes are never errors: a failed handler is a status code and,
/// optionally, an annotation on the request context. This type covers what
/// can go wrong before traffic flows: building a logger, reading its
/// configuration, binding a port.
#[derive(Debug)]
pub enum Error {
    /// Underlying I/O failure (bind, accept, flushing a log sink).
    Io(std::io::Error),
    /// A configuration value could not be understood.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
