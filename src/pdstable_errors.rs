//! # Error types for pdstable
//!
//! Three layers of failure exist when turning a PDS3 label and its data file into a
//! [`Table`](crate::table::Table):
//!
//! * [`SchemaError`] – the label's column description is malformed or inconsistent.
//!   Always fatal and raised before any record is decoded.
//! * [`DecodeError`] – one record could not be decoded: either its length disagrees with
//!   the schema (`RecordLength`) or a field cannot be parsed as its declared type
//!   (`ValueDecode`).
//! * [`PdsTableError`] – the crate-level error returned by public entry points. Record
//!   failures are wrapped with the index of the source record that produced them.
//!
//! Validity classification (invalid constants, out-of-range values) is **not** an error:
//! those values are kept and tagged, see [`Validity`](crate::decode::validity::Validity).
use thiserror::Error;

use crate::schema::column::DataType;

/// Malformed or inconsistent column description.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Record length must be a positive number of bytes")]
    ZeroRecordLength,

    #[error("Label is missing the table key {0}")]
    MissingTableKey(&'static str),

    #[error("Column {column} is missing the mandatory key {key}")]
    MissingKey { column: String, key: &'static str },

    #[error("Column {column} declares {key} {count} times")]
    AmbiguousKey {
        column: String,
        key: &'static str,
        count: usize,
    },

    #[error("Column {column}: {key} must be {expected}, found {found}")]
    InvalidKeyValue {
        column: String,
        key: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("Column {column}: unsupported DATA_TYPE {data_type}")]
    UnsupportedDataType { column: String, data_type: String },

    #[error("Column {column}: bytes {start}..={end} fall outside the record [1, {record_length}]")]
    OutOfBounds {
        column: String,
        start: usize,
        end: usize,
        record_length: usize,
    },

    #[error(
        "Column {column}: {items} items of {item_bytes} bytes every {item_offset} bytes need {needed} bytes, the column spans {bytes}"
    )]
    ItemLayout {
        column: String,
        items: usize,
        item_bytes: usize,
        item_offset: usize,
        needed: usize,
        bytes: usize,
    },

    #[error("Column {column}: inconsistent item count: {reason}")]
    ItemCount { column: String, reason: String },

    #[error("Column {column}: invalid VALID_RANGE: {reason}")]
    InvalidValidRange { column: String, reason: String },

    #[error("Duplicated column name: {0}")]
    DuplicateColumn(String),
}

/// Failure to decode a single fixed-length record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Record is {actual} bytes long, the schema expects {expected}")]
    RecordLength { expected: usize, actual: usize },

    #[error("Column {column} item {item}: cannot parse {raw:?} as {data_type}")]
    ValueDecode {
        column: String,
        item: usize,
        raw: String,
        data_type: DataType,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PdsTableError {
    #[error("Invalid table schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Record {row}: {source}")]
    Record {
        row: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Record count mismatch: label declares {declared} records, {actual} were read")]
    RecordCountMismatch { declared: usize, actual: usize },

    #[error("Assembly cancelled after {completed} records")]
    Cancelled { completed: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Row {index} out of range, the table has {rows} rows")]
    RowOutOfRange { index: usize, rows: usize },

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Invalid PDS time string: {0}")]
    InvalidTime(String),
}

impl PdsTableError {
    /// Index of the source record responsible for this error, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            PdsTableError::Record { row, .. } => Some(*row),
            _ => None,
        }
    }
}
