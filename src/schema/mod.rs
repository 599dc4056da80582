//! # Table schema
//!
//! A [`TableSchema`] is the decode plan of a PDS3 table: the fixed record length, the
//! advisory record count declared by the label, and the ordered list of
//! [`ColumnSchema`]s. It is built once per data file (usually by
//! [`SchemaBuilder`](crate::schema::builder::SchemaBuilder)), never mutated afterwards,
//! and shared read-only by every record decode.
//!
//! Modules
//! -----------------
//! * [`column`] – Column description, data types, sentinels and valid ranges.
//! * [`builder`] – Validated construction from label key/value data.
//! * [`format_spec`] – Parser for the `FORMAT` edit descriptors.
//!
//! Invariants
//! -----------------
//! * `record_length > 0`.
//! * Every column's byte range lies within `[1, record_length]`.
//! * Every column's item layout fits inside its span.
//! * Column names are unique. Byte ranges of distinct columns may overlap.
//!
//! Column order is the label declaration order and is the iteration order of the
//! resulting [`Table`](crate::table::Table).
pub mod builder;
pub mod column;
pub mod format_spec;

use serde::{Deserialize, Serialize};

use crate::{
    constants::FastHashMap,
    pdstable_errors::SchemaError,
    schema::column::ColumnSchema,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTableSchema")]
pub struct TableSchema {
    record_length: usize,
    record_count: usize,
    columns: Vec<ColumnSchema>,
    #[serde(skip)]
    index: FastHashMap<String, usize>,
}

/// Serialized form of a [`TableSchema`], validated by [`TableSchema::new`] on the way in.
#[derive(Deserialize)]
struct RawTableSchema {
    record_length: usize,
    record_count: usize,
    columns: Vec<ColumnSchema>,
}

impl TryFrom<RawTableSchema> for TableSchema {
    type Error = SchemaError;

    fn try_from(raw: RawTableSchema) -> Result<Self, Self::Error> {
        TableSchema::new(raw.record_length, raw.record_count, raw.columns)
    }
}

impl PartialEq for TableSchema {
    fn eq(&self, other: &Self) -> bool {
        self.record_length == other.record_length
            && self.record_count == other.record_count
            && self.columns == other.columns
    }
}

impl TableSchema {
    /// Assemble and validate a schema.
    ///
    /// Arguments
    /// -----------------
    /// * `record_length` – Fixed byte length of every record.
    /// * `record_count` – Number of records declared by the label (advisory).
    /// * `columns` – Columns in on-disk declaration order.
    ///
    /// Return
    /// ----------
    /// * The validated schema, or the first [`SchemaError`] found while walking the
    ///   columns in order.
    pub fn new(
        record_length: usize,
        record_count: usize,
        columns: Vec<ColumnSchema>,
    ) -> Result<Self, SchemaError> {
        if record_length == 0 {
            return Err(SchemaError::ZeroRecordLength);
        }

        let mut index = FastHashMap::default();
        for (position, column) in columns.iter().enumerate() {
            column.check_layout(record_length)?;
            if index.insert(column.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }

        Ok(TableSchema {
            record_length,
            record_count,
            columns,
            index,
        })
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.position(name).map(|i| &self.columns[i])
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(ColumnSchema::name)
    }
}

#[cfg(test)]
mod table_schema_test {
    use super::*;
    use crate::schema::column::DataType;

    fn two_columns() -> Vec<ColumnSchema> {
        vec![
            ColumnSchema::new("NAME", DataType::Text, 1, 5),
            ColumnSchema::new("COUNT", DataType::Integer, 7, 3),
        ]
    }

    #[test]
    fn test_new_keeps_order_and_index() {
        let schema = TableSchema::new(9, 4, two_columns()).unwrap();
        assert_eq!(schema.column_names().collect::<Vec<_>>(), ["NAME", "COUNT"]);
        assert_eq!(schema.position("COUNT"), Some(1));
        assert_eq!(schema.column("NAME").unwrap().byte_count(), 5);
        assert!(schema.column("MISSING").is_none());
        assert_eq!(schema.record_count(), 4);
    }

    #[test]
    fn test_new_rejects_columns_past_record_end() {
        assert_eq!(
            TableSchema::new(8, 1, two_columns()),
            Err(SchemaError::OutOfBounds {
                column: "COUNT".into(),
                start: 7,
                end: 9,
                record_length: 8
            })
        );
    }

    #[test]
    fn test_new_rejects_duplicates_and_zero_length() {
        let mut columns = two_columns();
        columns.push(ColumnSchema::new("NAME", DataType::Text, 1, 2));
        assert_eq!(
            TableSchema::new(9, 1, columns),
            Err(SchemaError::DuplicateColumn("NAME".into()))
        );
        assert_eq!(
            TableSchema::new(0, 1, Vec::new()),
            Err(SchemaError::ZeroRecordLength)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let schema = TableSchema::new(9, 4, two_columns()).unwrap();
        let mut json = serde_json::to_value(&schema).unwrap();

        let restored: TableSchema = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(restored, schema);
        assert_eq!(restored.position("COUNT"), Some(1));

        json["record_length"] = serde_json::json!(4);
        let error = serde_json::from_value::<TableSchema>(json).unwrap_err();
        assert!(error.to_string().contains("fall outside the record"));
    }

    #[test]
    fn test_overlapping_columns_are_allowed() {
        let columns = vec![
            ColumnSchema::new("DATE", DataType::Text, 1, 10),
            ColumnSchema::new("YEAR", DataType::Integer, 1, 4),
        ];
        assert!(TableSchema::new(10, 1, columns).is_ok());
    }
}
