use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::{decode::validity::Validity, pdstable_errors::PdsTableError, time::parse_pds_time};

/// A parsed field item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
    /// Trimmed raw text of a TIME column.
    Time(String),
    /// Placeholder for an item that failed to decode in lenient assembly.
    Absent,
}

impl Value {
    /// Text payload of a `Text` or `Time` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Time(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload of an `Integer` or a `Real`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(s) | Value::Time(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Absent => write!(f, "--"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

/// One decoded item together with its validity tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedValue {
    pub value: Value,
    pub validity: Validity,
}

impl DecodedValue {
    pub fn new(value: Value, validity: Validity) -> Self {
        DecodedValue { value, validity }
    }

    /// The lenient-mode stand-in for an item that could not be decoded.
    pub fn placeholder() -> Self {
        DecodedValue::new(Value::Absent, Validity::InvalidConstant)
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    /// Interpret a valid TIME item as an [`Epoch`].
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` for items that are not TIME values or are not valid (sentinels,
    ///   placeholders).
    /// * `Ok(Some(epoch))` for a readable PDS time string.
    /// * [`PdsTableError::InvalidTime`] for a valid TIME item that does not read as a time.
    pub fn epoch(&self) -> Result<Option<Epoch>, PdsTableError> {
        match (&self.value, self.validity) {
            (Value::Time(text), Validity::Valid) => parse_pds_time(text).map(Some),
            _ => Ok(None),
        }
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.validity {
            Validity::Valid => write!(f, "{}", self.value),
            validity => write!(f, "{} ({validity})", self.value),
        }
    }
}
