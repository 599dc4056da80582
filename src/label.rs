//! # Parsed PDS3 label data
//!
//! Tokenizing and parsing the label text is the job of an external label parser. This
//! module defines the shape in which that collaborator hands its result over: an
//! **order-preserving**, loosely-typed key/value tree.
//!
//! ## Overview
//! -----------------
//! * [`LabelValue`] – one attribute value (integer, real with its literal text, quoted
//!   text, unquoted symbol, sequence, or nested object).
//! * [`LabelObject`] – an ordered list of `(key, value)` pairs. Keys may repeat; lookups
//!   return the first occurrence and [`LabelObject::count`] exposes duplicates so the
//!   schema builder can reject ambiguous declarations.
//!
//! Real values keep the literal text they were written with. The validity classifier
//! compares sentinel values through that decimal representation, so `-1.0E32` written
//! in the label matches `-1.E32` written in the data file.
//!
//! ## Example
//! -----------------
//! ```rust
//! use pdstable::label::{LabelObject, LabelValue};
//!
//! let column = LabelObject::new()
//!     .with("OBJECT", LabelValue::symbol("COLUMN"))
//!     .with("NAME", "FILTER")
//!     .with("DATA_TYPE", LabelValue::symbol("CHARACTER"))
//!     .with("START_BYTE", 1)
//!     .with("BYTES", 5);
//!
//! assert_eq!(column.get("BYTES").and_then(LabelValue::as_integer), Some(5));
//! assert_eq!(column.object_class(), Some("COLUMN"));
//! ```
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::constants::OBJECT;

/// A single attribute value of a PDS3 label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabelValue {
    Integer(i64),
    /// Real number with the literal text it was written as.
    Real {
        value: f64,
        literal: String,
    },
    /// Double-quoted text.
    Text(String),
    /// Unquoted or single-quoted symbol (`CHARACTER`, `'N/A'`).
    Symbol(String),
    Sequence(Vec<LabelValue>),
    Object(LabelObject),
}

impl LabelValue {
    /// Build a symbol value.
    pub fn symbol(symbol: impl Into<String>) -> Self {
        LabelValue::Symbol(symbol.into())
    }

    /// Build a real value from its literal text.
    ///
    /// Fortran `D` exponents are accepted. Returns `None` when the literal is not a number.
    pub fn real_literal(literal: &str) -> Option<Self> {
        let literal = literal.trim();
        let value = literal.replace(['D', 'd'], "E").parse::<f64>().ok()?;
        Some(LabelValue::Real {
            value,
            literal: literal.to_string(),
        })
    }

    /// Integer payload, if this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            LabelValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload of an integer or a real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LabelValue::Integer(i) => Some(*i as f64),
            LabelValue::Real { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Text payload of a quoted text or a symbol.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LabelValue::Text(s) | LabelValue::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[LabelValue]> {
        match self {
            LabelValue::Sequence(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&LabelObject> {
        match self {
            LabelValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            LabelValue::Integer(_) => "an integer",
            LabelValue::Real { .. } => "a real",
            LabelValue::Text(_) => "a text",
            LabelValue::Symbol(_) => "a symbol",
            LabelValue::Sequence(_) => "a sequence",
            LabelValue::Object(_) => "an object",
        }
    }
}

impl std::fmt::Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelValue::Integer(i) => write!(f, "{i}"),
            LabelValue::Real { literal, .. } => write!(f, "{literal}"),
            LabelValue::Text(s) => write!(f, "\"{s}\""),
            LabelValue::Symbol(s) => write!(f, "{s}"),
            LabelValue::Sequence(values) => write!(f, "({})", values.iter().format(", ")),
            LabelValue::Object(object) => {
                write!(f, "OBJECT {}", object.object_class().unwrap_or("?"))
            }
        }
    }
}

impl From<i64> for LabelValue {
    fn from(i: i64) -> Self {
        LabelValue::Integer(i)
    }
}

impl From<i32> for LabelValue {
    fn from(i: i32) -> Self {
        LabelValue::Integer(i as i64)
    }
}

impl From<f64> for LabelValue {
    fn from(value: f64) -> Self {
        LabelValue::Real {
            value,
            literal: format!("{value:?}"),
        }
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue::Text(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        LabelValue::Text(s)
    }
}

impl From<LabelObject> for LabelValue {
    fn from(object: LabelObject) -> Self {
        LabelValue::Object(object)
    }
}

impl<T: Into<LabelValue>> From<Vec<T>> for LabelValue {
    fn from(values: Vec<T>) -> Self {
        LabelValue::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Ordered key/value pairs of one label object (file level, `TABLE`, `COLUMN`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelObject {
    entries: Vec<(String, LabelValue)>,
}

impl LabelObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<LabelValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append an entry. Existing entries with the same key are kept.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<LabelValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// First value declared under `key`.
    pub fn get(&self, key: &str) -> Option<&LabelValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Every value declared under `key`, in declaration order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a LabelValue> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Number of times `key` is declared.
    pub fn count(&self, key: &str) -> usize {
        self.get_all(key).count()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &LabelValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `OBJECT` class of this object (`TABLE`, `COLUMN`, ...).
    pub fn object_class(&self) -> Option<&str> {
        self.get(OBJECT).and_then(LabelValue::as_str)
    }

    /// Nested objects whose `OBJECT` class equals `class` (case-insensitive), in order.
    pub fn objects_of_class<'a>(
        &'a self,
        class: &'a str,
    ) -> impl Iterator<Item = &'a LabelObject> + 'a {
        self.entries.iter().filter_map(move |(_, value)| {
            value
                .as_object()
                .filter(|o| o.object_class().is_some_and(|c| c.eq_ignore_ascii_case(class)))
        })
    }
}
