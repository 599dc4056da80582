//! # Validity classification
//!
//! Every decoded item carries a [`Validity`] tag computed from the column's sentinels
//! and valid range. Classification never fails: a value that is "no data" or out of
//! bounds is kept and tagged, only text that cannot be parsed at all is an error (and
//! that is the decoder's business).
//!
//! ## Precedence
//! -----------------
//! 1. The value equals one of the column's sentinels → [`Validity::InvalidConstant`].
//! 2. The value is numeric and falls outside the inclusive valid range →
//!    [`Validity::OutOfRange`].
//! 3. Otherwise → [`Validity::Valid`].
//!
//! ## Equality rules
//! -----------------
//! * Integer vs integer sentinel: exact.
//! * Integer vs real sentinel: only when the sentinel is integral and numerically equal.
//! * Real vs numeric sentinel: `f64` equality against the value parsed from the
//!   sentinel's literal.
//! * Text / Time vs any sentinel: equality with the sentinel's literal text.
use serde::{Deserialize, Serialize};

use crate::{
    decode::value::Value,
    schema::column::{Sentinel, ValidRange},
};

/// Validity tag of a decoded item.
///
/// Variants are ordered by severity so merging the tags of an array is a `max`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Validity {
    #[default]
    Valid,
    OutOfRange,
    InvalidConstant,
}

impl Validity {
    /// The worst of two tags.
    pub fn merge(self, other: Validity) -> Validity {
        self.max(other)
    }
}

impl std::fmt::Display for Validity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Validity::Valid => "VALID",
            Validity::OutOfRange => "OUT_OF_RANGE",
            Validity::InvalidConstant => "INVALID_CONSTANT",
        };
        write!(f, "{tag}")
    }
}

pub struct ValidityClassifier;

impl ValidityClassifier {
    /// Classify one parsed item.
    ///
    /// Arguments
    /// -----------------
    /// * `value` – The parsed item.
    /// * `invalid_constants` – Sentinels of the column, primary first.
    /// * `valid_range` – Optional inclusive bounds for numeric values.
    ///
    /// Return
    /// ----------
    /// * The [`Validity`] tag. [`Value::Absent`] is always `InvalidConstant`.
    pub fn classify(
        value: &Value,
        invalid_constants: &[Sentinel],
        valid_range: Option<&ValidRange>,
    ) -> Validity {
        if value.is_absent() || invalid_constants.iter().any(|s| is_sentinel(value, s)) {
            return Validity::InvalidConstant;
        }

        match (value.as_f64(), valid_range) {
            (Some(v), Some(range)) if !range.contains(v) => Validity::OutOfRange,
            _ => Validity::Valid,
        }
    }
}

fn is_sentinel(value: &Value, sentinel: &Sentinel) -> bool {
    match (value, sentinel) {
        (Value::Integer(i), Sentinel::Integer(s)) => i == s,
        (Value::Integer(i), Sentinel::Real { value: s, .. }) => {
            s.fract() == 0.0 && *i as f64 == *s
        }
        (Value::Integer(i), Sentinel::Text(s)) => s.parse::<i64>().is_ok_and(|s| s == *i),
        (Value::Real(r), sentinel) => sentinel.as_f64().is_some_and(|s| s == *r),
        (Value::Text(t) | Value::Time(t), sentinel) => *t == *sentinel.literal(),
        (Value::Absent, _) => false,
    }
}
