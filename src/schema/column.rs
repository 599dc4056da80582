//! # Column descriptions
//!
//! A [`ColumnSchema`] is the executable form of one `COLUMN` object of a PDS3 label:
//! where the column sits in a record, how its items repeat, how its text is parsed,
//! and which rules classify its values.
//!
//! ## Byte geometry
//! -----------------
//! Offsets follow the label's **1-based** convention. Item `i` of a column occupies the
//! bytes `start_byte + i * item_offset ..= start_byte + i * item_offset + item_byte_count - 1`.
//! Scalar columns are the `item_count == 1` case with `item_byte_count == byte_count`,
//! so the decoder has a single code path. [`ColumnSchema::item_window`] converts this to
//! a 0-based range into the record slice.
//!
//! Geometry is checked against the record length when the column is placed into a
//! [`TableSchema`](crate::schema::TableSchema), not when the column is built.
use std::{borrow::Cow, ops::Range};

use serde::{Deserialize, Serialize};

use crate::{
    label::LabelValue,
    pdstable_errors::SchemaError,
    schema::format_spec::FormatSpec,
};

/// Leaf scalar kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Text,
    Real,
    Integer,
    /// Kept as trimmed text; see [`crate::time`] for interpretation.
    Time,
}

/// `DATA_TYPE` prefixes of binary encodings, which an ASCII table cannot hold.
const BINARY_PREFIXES: [&str; 10] = [
    "MSB_", "LSB_", "IEEE_", "PC_", "VAX", "SUN_", "MAC_", "UNSIGNED_", "BIT_", "BINARY_",
];
const UNSUPPORTED_TYPES: [&str; 4] = ["BOOLEAN", "COMPLEX", "N/A", "BIT_STRING"];

impl DataType {
    /// Map a PDS3 `DATA_TYPE` value onto a leaf kind.
    ///
    /// Checks run in the order INTEGER, REAL, TIME, TEXT. A `CHARACTER` column whose name
    /// ends with `_TIME` or `_DATE` is a TIME column.
    ///
    /// Arguments
    /// -----------------
    /// * `data_type` – The label's `DATA_TYPE` value (e.g. `ASCII_REAL`).
    /// * `column` – The column name, used for the `_TIME`/`_DATE` rule and error messages.
    ///
    /// Return
    /// ----------
    /// * The leaf [`DataType`], or [`SchemaError::UnsupportedDataType`] for binary and
    ///   unknown encodings.
    pub fn from_pds3(data_type: &str, column: &str) -> Result<Self, SchemaError> {
        let normalized = data_type.trim().to_ascii_uppercase().replace(' ', "_");
        let unsupported = || SchemaError::UnsupportedDataType {
            column: column.to_string(),
            data_type: data_type.to_string(),
        };

        if BINARY_PREFIXES.iter().any(|p| normalized.starts_with(p))
            || UNSUPPORTED_TYPES.contains(&normalized.as_str())
        {
            return Err(unsupported());
        }

        let name = column.to_ascii_uppercase();
        if normalized.contains("INTEGER") {
            Ok(DataType::Integer)
        } else if normalized.contains("REAL") {
            Ok(DataType::Real)
        } else if normalized.contains("TIME")
            || normalized.contains("DATE")
            || name.ends_with("_TIME")
            || name.ends_with("_DATE")
        {
            Ok(DataType::Time)
        } else if normalized.contains("CHAR") {
            Ok(DataType::Text)
        } else {
            Err(unsupported())
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Real | DataType::Integer)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Integer => "INTEGER",
            DataType::Time => "TIME",
        };
        write!(f, "{name}")
    }
}

/// A "no data" value declared for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sentinel {
    Integer(i64),
    /// Real sentinel with the literal text it was declared as.
    Real { value: f64, literal: String },
    Text(String),
}

impl Sentinel {
    /// Convert a label value into a sentinel. Sequences and objects are not sentinels.
    pub fn from_label(value: &LabelValue) -> Option<Self> {
        match value {
            LabelValue::Integer(i) => Some(Sentinel::Integer(*i)),
            LabelValue::Real { value, literal } => Some(Sentinel::Real {
                value: *value,
                literal: literal.clone(),
            }),
            LabelValue::Text(s) | LabelValue::Symbol(s) => Some(Sentinel::Text(s.trim().to_string())),
            LabelValue::Sequence(_) | LabelValue::Object(_) => None,
        }
    }

    /// Build a real sentinel from its decimal literal.
    pub fn real(literal: &str) -> Option<Self> {
        match LabelValue::real_literal(literal)? {
            LabelValue::Real { value, literal } => Some(Sentinel::Real { value, literal }),
            _ => None,
        }
    }

    /// The sentinel as it is written in a table.
    pub fn literal(&self) -> Cow<'_, str> {
        match self {
            Sentinel::Integer(i) => Cow::Owned(i.to_string()),
            Sentinel::Real { literal, .. } => Cow::Borrowed(literal),
            Sentinel::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Numeric value of a numeric sentinel, or of a text sentinel that reads as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Sentinel::Integer(i) => Some(*i as f64),
            Sentinel::Real { value, .. } => Some(*value),
            Sentinel::Text(s) => s.parse::<f64>().ok(),
        }
    }

    /// Whether the trimmed raw text of a field is this sentinel.
    ///
    /// Numeric sentinels also match any text that reads as the same number, so
    /// `-1.E32` in a data file matches a `-1.0E32` declaration.
    pub fn matches_text(&self, text: &str) -> bool {
        if text == self.literal() {
            return true;
        }
        match self {
            Sentinel::Text(_) => false,
            _ => match (self.as_f64(), text.replace(['D', 'd'], "E").parse::<f64>()) {
                (Some(expected), Ok(found)) => expected == found,
                _ => false,
            },
        }
    }
}

impl From<i64> for Sentinel {
    fn from(i: i64) -> Self {
        Sentinel::Integer(i)
    }
}

impl From<&str> for Sentinel {
    fn from(s: &str) -> Self {
        Sentinel::Text(s.to_string())
    }
}

/// Inclusive bounds a numeric value is expected to fall within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub fn new(min: f64, max: f64) -> Self {
        ValidRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Immutable description of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) start_byte: usize,
    pub(crate) byte_count: usize,
    pub(crate) item_count: usize,
    pub(crate) item_byte_count: usize,
    pub(crate) item_offset: usize,
    pub(crate) format_spec: Option<FormatSpec>,
    pub(crate) units: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) valid_range: Option<ValidRange>,
    pub(crate) invalid_constants: Vec<Sentinel>,
}

impl ColumnSchema {
    /// Create a scalar column spanning `byte_count` bytes from the 1-based `start_byte`.
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        start_byte: usize,
        byte_count: usize,
    ) -> Self {
        ColumnSchema {
            name: name.into(),
            data_type,
            start_byte,
            byte_count,
            item_count: 1,
            item_byte_count: byte_count,
            item_offset: byte_count,
            format_spec: None,
            units: None,
            description: None,
            valid_range: None,
            invalid_constants: Vec::new(),
        }
    }

    /// Declare the column as an array of `item_count` items.
    pub fn with_items(mut self, item_count: usize, item_byte_count: usize, item_offset: usize) -> Self {
        self.item_count = item_count;
        self.item_byte_count = item_byte_count;
        self.item_offset = item_offset;
        self
    }

    pub fn with_format(mut self, format_spec: FormatSpec) -> Self {
        self.format_spec = Some(format_spec);
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_valid_range(mut self, min: f64, max: f64) -> Self {
        self.valid_range = Some(ValidRange::new(min, max));
        self
    }

    /// Add a sentinel. The first sentinel added is the column's primary invalid constant.
    pub fn with_invalid_constant(mut self, sentinel: impl Into<Sentinel>) -> Self {
        let sentinel = sentinel.into();
        if !self.invalid_constants.contains(&sentinel) {
            self.invalid_constants.push(sentinel);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// 1-based offset of the first byte.
    pub fn start_byte(&self) -> usize {
        self.start_byte
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// 1-based offset of the last byte, saturating for geometries no schema accepts.
    pub fn end_byte(&self) -> usize {
        self.start_byte
            .saturating_add(self.byte_count)
            .saturating_sub(1)
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn item_byte_count(&self) -> usize {
        self.item_byte_count
    }

    pub fn item_offset(&self) -> usize {
        self.item_offset
    }

    pub fn is_array(&self) -> bool {
        self.item_count > 1
    }

    pub fn format_spec(&self) -> Option<&FormatSpec> {
        self.format_spec.as_ref()
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn valid_range(&self) -> Option<&ValidRange> {
        self.valid_range.as_ref()
    }

    /// The primary sentinel (the label's `INVALID_CONSTANT` when declared).
    pub fn invalid_constant(&self) -> Option<&Sentinel> {
        self.invalid_constants.first()
    }

    /// Every sentinel of the column.
    pub fn invalid_constants(&self) -> &[Sentinel] {
        &self.invalid_constants
    }

    /// Bytes needed by the item layout: `item_offset * (item_count - 1) + item_byte_count`,
    /// `None` when that overflows.
    pub fn item_span(&self) -> Option<usize> {
        self.item_offset
            .checked_mul(self.item_count.saturating_sub(1))?
            .checked_add(self.item_byte_count)
    }

    /// 0-based byte range of item `index` inside a record.
    ///
    /// Only meaningful once the column was validated by a
    /// [`TableSchema`](crate::schema::TableSchema).
    pub fn item_window(&self, index: usize) -> Range<usize> {
        let start = self.start_byte - 1 + self.item_offset * index;
        start..start + self.item_byte_count
    }

    /// Check the column geometry against a record length.
    pub(crate) fn check_layout(&self, record_length: usize) -> Result<(), SchemaError> {
        let column = || self.name.clone();

        if self.item_count == 0 {
            return Err(SchemaError::ItemCount {
                column: column(),
                reason: "ITEMS must be at least 1".to_string(),
            });
        }
        if self.byte_count == 0 || self.item_byte_count == 0 {
            return Err(SchemaError::ItemCount {
                column: column(),
                reason: "BYTES and ITEM_BYTES must be positive".to_string(),
            });
        }
        if self.item_count > 1 && self.item_offset == 0 {
            return Err(SchemaError::ItemCount {
                column: column(),
                reason: "ITEM_OFFSET must be positive for multi-item columns".to_string(),
            });
        }

        let end = self.start_byte.checked_add(self.byte_count - 1);
        if self.start_byte == 0 || end.map_or(true, |end| end > record_length) {
            return Err(SchemaError::OutOfBounds {
                column: column(),
                start: self.start_byte,
                end: self.end_byte(),
                record_length,
            });
        }

        let needed = self.item_span();
        if needed.map_or(true, |needed| needed > self.byte_count) {
            return Err(SchemaError::ItemLayout {
                column: column(),
                items: self.item_count,
                item_bytes: self.item_byte_count,
                item_offset: self.item_offset,
                needed: needed.unwrap_or(usize::MAX),
                bytes: self.byte_count,
            });
        }

        // One more item would still fit: ITEMS understates the column.
        let with_one_more = self
            .item_offset
            .checked_mul(self.item_count)
            .and_then(|n| n.checked_add(self.item_byte_count));
        if with_one_more.is_some_and(|bytes| bytes <= self.byte_count) {
            return Err(SchemaError::ItemCount {
                column: column(),
                reason: format!(
                    "{} bytes hold more than {} items of {} bytes every {} bytes",
                    self.byte_count, self.item_count, self.item_byte_count, self.item_offset
                ),
            });
        }

        if let Some(range) = &self.valid_range {
            if !(range.min <= range.max) {
                return Err(SchemaError::InvalidValidRange {
                    column: column(),
                    reason: format!("minimum {} exceeds maximum {}", range.min, range.max),
                });
            }
        }
        Ok(())
    }
}
