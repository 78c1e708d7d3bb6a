//! Log severity as a typed enum.
//!
//! Variants are declared in verbosity order, so the derived `Ord` gives
//! `Debug < Info < Warn < Error` and a minimum-severity gate is a plain
//! comparison.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// Importance tag of a log record.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Uppercase label used by the console encoding (e.g. `"WARN"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info  => "INFO",
            Self::Warn  => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Lowercase label used in JSON records (e.g. `"warn"`).
    pub(crate) fn as_lowercase(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info  => "info",
            Self::Warn  => "warn",
            Self::Error => "error",
        }
    }
}

/// Parses a severity name, case-insensitively. `"warning"` is accepted as an
/// alias for [`Severity::Warn`].
impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug"             => Ok(Self::Debug),
            "info"              => Ok(Self::Info),
            "warn" | "warning"  => Ok(Self::Warn),
            "error"             => Ok(Self::Error),
            _                   => Err(Error::Config(format!("unknown severity `{s}`"))),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
