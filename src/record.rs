//! Structured records: a severity, a message and ordered key-value fields.
//!
//! Build field lists with the [`fields!`](crate::fields) macro:
//!
//! ```rust
//! use reqlog::{fields, Value};
//! use std::time::Duration;
//!
//! let f = fields!["path" => "/users/7", "statusCode" => 200u16, "latency" => Duration::from_millis(3)];
//! assert_eq!(f[1].value, Value::U64(200));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Map;

use crate::severity::Severity;

// ── Value ─────────────────────────────────────────────────────────────────────

/// The value half of a structured field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    /// Rendered human-readable (`1.5ms`) by every encoding.
    Duration(Duration),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s)      => serializer.serialize_str(s),
            Self::I64(n)      => serializer.serialize_i64(*n),
            Self::U64(n)      => serializer.serialize_u64(*n),
            Self::F64(n)      => serializer.serialize_f64(*n),
            Self::Bool(b)     => serializer.serialize_bool(*b),
            Self::Duration(d) => serializer.collect_str(&format_args!("{d:?}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s)      => write!(f, "{s:?}"),
            Self::I64(n)      => write!(f, "{n}"),
            Self::U64(n)      => write!(f, "{n}"),
            Self::F64(n)      => write!(f, "{n}"),
            Self::Bool(b)     => write!(f, "{b}"),
            Self::Duration(d) => write!(f, "{d:?}"),
        }
    }
}

macro_rules! value_from {
    ($variant:ident: $($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self { Self::$variant(v.into()) }
        })+
    };
}

value_from!(I64: i8, i16, i32, i64);
value_from!(U64: u8, u16, u32, u64);
value_from!(F64: f32, f64);
value_from!(Bool: bool);
value_from!(Duration: Duration);
value_from!(Str: String, &str, Cow<'_, str>);

impl From<&String> for Value {
    fn from(v: &String) -> Self { Self::Str(v.clone()) }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self { Self::U64(v as u64) }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self { Self::I64(v as i64) }
}

// ── Field ─────────────────────────────────────────────────────────────────────

/// One key-value pair of a record.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Builds a `Vec<Field>` from `key => value` pairs, preserving order.
#[macro_export]
macro_rules! fields {
    () => {
        ::std::vec::Vec::<$crate::Field>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Field::new($key, $value)),+]
    };
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A single log entry, handed to a [`Sink`](crate::Sink) as one unit.
#[derive(Clone, Debug)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(severity: Severity, message: String, fields: Vec<Field>) -> Self {
        Self { time: Utc::now(), severity, message, fields }
    }

    /// Looks up a field by key. With duplicate keys the last one wins.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().rev().find(|f| f.key == key).map(|f| &f.value)
    }

    pub(crate) fn timestamp(&self) -> String {
        self.time.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Fields as an insertion-ordered JSON object.
    pub(crate) fn fields_json(&self) -> Map<String, serde_json::Value> {
        let mut map = Map::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = serde_json::to_value(&field.value).unwrap_or(serde_json::Value::Null);
            map.insert(field.key.to_string(), value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_keeps_insertion_order() {
        let fields = fields!["b" => 1, "a" => "x", "c" => true];
        let keys: Vec<_> = fields.iter().map(|f| f.key.as_ref()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert!(fields![].is_empty());
    }

    #[test]
    fn duplicate_keys_resolve_to_the_last_value() {
        let record = Record::new(Severity::Info, "m".into(), fields!["k" => 1, "k" => 2]);
        assert_eq!(record.field("k"), Some(&Value::I64(2)));
        assert_eq!(record.field("missing"), None);
    }

    #[test]
    fn durations_render_human_readable() {
        let value = Value::from(Duration::from_micros(1500));
        assert_eq!(serde_json::to_value(&value).unwrap(), serde_json::json!("1.5ms"));
        assert_eq!(value.to_string(), "1.5ms");
    }

    #[test]
    fn json_fields_follow_insertion_order() {
        let record = Record::new(
            Severity::Info,
            "m".into(),
            fields!["path" => "/a", "comment" => "", "statusCode" => 200u16],
        );
        let rendered = serde_json::to_string(&record.fields_json()).unwrap();
        assert_eq!(rendered, r#"{"path":"/a","comment":"","statusCode":200}"#);
    }
}
