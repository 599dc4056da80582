//! Schema-driven decoding of PDS3 fixed-length-record ASCII tables.
//!
//! A label's `COLUMN` objects become a [`TableSchema`] ([`SchemaBuilder`]), every raw
//! record is decoded against it ([`RecordDecoder`]), and [`TableAssembler`] gathers the
//! rows into a columnar [`Table`] with per-item validity tags.
pub mod assemble;
pub mod constants;
pub mod decode;
pub mod label;
pub mod pdstable_errors;
pub mod records;
pub mod schema;
pub mod table;
pub mod time;

pub use assemble::{AssemblyMode, AssemblyOptions, Diagnostic, DiagnosticKind, TableAssembler};
pub use decode::{
    validity::Validity,
    value::{DecodedValue, Value},
    DecodeOptions, RecordDecoder, Row,
};
pub use pdstable_errors::{DecodeError, PdsTableError, SchemaError};
pub use records::FixedLengthRecords;
pub use schema::{
    builder::{SchemaBuilder, SchemaOverrides},
    TableSchema,
};
pub use table::Table;
