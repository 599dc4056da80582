//! # Schema construction from label data
//!
//! [`SchemaBuilder`] turns the `COLUMN` objects handed over by the label parser into a
//! validated [`TableSchema`].
//!
//! ## Key handling
//! -----------------
//! * **Mandatory keys** (`NAME`, `DATA_TYPE`, `START_BYTE`, `BYTES`) must be declared
//!   exactly once with the expected value kind. A missing, repeated or mistyped key is a
//!   [`SchemaError`]; nothing is defaulted silently.
//! * **Optional keys** (`ITEMS`, `ITEM_BYTES`, `ITEM_OFFSET`, `FORMAT`, `UNITS`,
//!   `DESCRIPTION`, `VALID_RANGE`, `VALID_MINIMUM`, `VALID_MAXIMUM`, sentinel keys) mean
//!   "feature absent" when missing. Keys that shape the decoding are still rejected when
//!   declared twice.
//! * An unreadable `FORMAT` is only a hint and is dropped with a warning.
//!
//! ## Item defaults
//! -----------------
//! * `ITEMS` absent → 1.
//! * `ITEM_BYTES` absent → `BYTES` for scalars, `BYTES / ITEMS` for arrays when the
//!   division is exact (a [`SchemaError::ItemCount`] otherwise).
//! * `ITEM_OFFSET` absent → `ITEM_BYTES`.
//!
//! ## Validity overrides
//! -----------------
//! [`SchemaOverrides`] augments the label with caller knowledge: extra sentinels per
//! column, a default sentinel set for columns without their own entry, and valid ranges
//! that replace the label's.
//!
//! ## Example
//! -----------------
//! ```rust
//! use pdstable::label::{LabelObject, LabelValue};
//! use pdstable::schema::builder::SchemaBuilder;
//!
//! let columns = vec![LabelObject::new()
//!     .with("NAME", "COUNT")
//!     .with("DATA_TYPE", LabelValue::symbol("ASCII_INTEGER"))
//!     .with("START_BYTE", 1)
//!     .with("BYTES", 3)
//!     .with("INVALID_CONSTANT", -99)];
//!
//! let schema = SchemaBuilder::new().build(&columns, 5, 10).unwrap();
//! assert_eq!(schema.columns()[0].invalid_constants().len(), 1);
//! ```
use crate::{
    constants::{
        FastHashMap, BYTES, COLUMN_OBJECT, DATA_TYPE, DESCRIPTION, FILE_RECORDS, FORMAT, ITEMS,
        ITEM_BYTES, ITEM_OFFSET, NAME, RECORD_BYTES, ROWS, ROW_BYTES, SENTINEL_KEYS, START_BYTE,
        UNITS, VALID_MAXIMUM, VALID_MINIMUM, VALID_RANGE,
    },
    label::{LabelObject, LabelValue},
    pdstable_errors::SchemaError,
    schema::{
        column::{ColumnSchema, DataType, Sentinel, ValidRange},
        format_spec::FormatSpec,
        TableSchema,
    },
};

/// Caller-supplied validity rules merged on top of the label's.
#[derive(Debug, Clone, Default)]
pub struct SchemaOverrides {
    invalid: FastHashMap<String, Vec<Sentinel>>,
    default_invalid: Vec<Sentinel>,
    valid_ranges: FastHashMap<String, ValidRange>,
}

impl SchemaOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra sentinels for one column. Columns with an entry do not get the default set.
    pub fn with_invalid<S, I>(mut self, column: impl Into<String>, sentinels: I) -> Self
    where
        S: Into<Sentinel>,
        I: IntoIterator<Item = S>,
    {
        self.invalid
            .entry(column.into())
            .or_default()
            .extend(sentinels.into_iter().map(Into::into));
        self
    }

    /// Sentinels added to every column without its own entry.
    pub fn with_default_invalid<S, I>(mut self, sentinels: I) -> Self
    where
        S: Into<Sentinel>,
        I: IntoIterator<Item = S>,
    {
        self.default_invalid
            .extend(sentinels.into_iter().map(Into::into));
        self
    }

    /// Valid range replacing the label's `VALID_RANGE` for one column.
    pub fn with_valid_range(mut self, column: impl Into<String>, min: f64, max: f64) -> Self {
        self.valid_ranges
            .insert(column.into(), ValidRange::new(min, max));
        self
    }

    fn invalid_for(&self, column: &str) -> &[Sentinel] {
        self.invalid
            .get(column)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_invalid)
    }
}

/// Validated construction of a [`TableSchema`] from label key/value data.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    overrides: SchemaOverrides,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(mut self, overrides: SchemaOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Build a schema from an ordered list of column objects.
    ///
    /// Arguments
    /// -----------------
    /// * `label_columns` – Column objects in label declaration order.
    /// * `record_length` – Fixed record length in bytes (`RECORD_BYTES`).
    /// * `record_count` – Declared number of records (`FILE_RECORDS`).
    ///
    /// Return
    /// ----------
    /// * The validated [`TableSchema`], with columns in input order.
    /// * A [`SchemaError`] for the first malformed column.
    ///
    /// See also
    /// ------------
    /// * [`SchemaBuilder::from_label`] – Same, reading geometry and columns from label objects.
    /// * [`TableSchema::new`] – Geometry validation.
    pub fn build<'a, I>(
        &self,
        label_columns: I,
        record_length: usize,
        record_count: usize,
    ) -> Result<TableSchema, SchemaError>
    where
        I: IntoIterator<Item = &'a LabelObject>,
    {
        let columns = label_columns
            .into_iter()
            .enumerate()
            .map(|(index, object)| self.column_from_label(index, object))
            .collect::<Result<Vec<_>, _>>()?;

        TableSchema::new(record_length, record_count, columns)
    }

    /// Build a schema from the file-level label object and the table object.
    ///
    /// The record length is read from `RECORD_BYTES` (file object, then table object),
    /// falling back to the table's `ROW_BYTES`. The record count is read from
    /// `FILE_RECORDS`, falling back to the table's `ROWS`. Columns are the nested
    /// objects of the table whose `OBJECT` class is `COLUMN`.
    pub fn from_label(
        &self,
        file: &LabelObject,
        table: &LabelObject,
    ) -> Result<TableSchema, SchemaError> {
        let lookup = |objects: &[&LabelObject], key: &'static str| {
            objects
                .iter()
                .find_map(|object| object.get(key))
                .map(|value| as_usize(value, "the table", key))
                .transpose()
        };

        let record_length = match lookup(&[file, table], RECORD_BYTES)? {
            Some(length) => length,
            None => lookup(&[table], ROW_BYTES)?
                .ok_or(SchemaError::MissingTableKey(RECORD_BYTES))?,
        };
        let record_count = match lookup(&[file, table], FILE_RECORDS)? {
            Some(count) => count,
            None => lookup(&[table], ROWS)?.ok_or(SchemaError::MissingTableKey(FILE_RECORDS))?,
        };

        self.build(
            table.objects_of_class(COLUMN_OBJECT),
            record_length,
            record_count,
        )
    }

    fn column_from_label(
        &self,
        index: usize,
        object: &LabelObject,
    ) -> Result<ColumnSchema, SchemaError> {
        let anonymous = format!("#{}", index + 1);
        let name = mandatory(object, NAME, &anonymous)?;
        let name = name
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| invalid_value(&anonymous, NAME, "a text", name))?;

        let data_type = mandatory(object, DATA_TYPE, &name)?;
        let data_type = data_type
            .as_str()
            .ok_or_else(|| invalid_value(&name, DATA_TYPE, "a symbol", data_type))
            .and_then(|dt| DataType::from_pds3(dt, &name))?;

        let start_byte = as_usize(mandatory(object, START_BYTE, &name)?, &name, START_BYTE)?;
        let byte_count = as_usize(mandatory(object, BYTES, &name)?, &name, BYTES)?;

        let item_count = optional_usize(object, ITEMS, &name)?.unwrap_or(1);
        let item_byte_count = match optional_usize(object, ITEM_BYTES, &name)? {
            Some(bytes) => bytes,
            None if item_count <= 1 => byte_count,
            None if byte_count % item_count == 0 => byte_count / item_count,
            None => {
                return Err(SchemaError::ItemCount {
                    column: name,
                    reason: format!(
                        "ITEM_BYTES is missing and {byte_count} bytes do not split into {item_count} items"
                    ),
                })
            }
        };
        let item_offset = optional_usize(object, ITEM_OFFSET, &name)?.unwrap_or(if item_count <= 1 {
            byte_count
        } else {
            item_byte_count
        });

        let mut column = ColumnSchema::new(name.clone(), data_type, start_byte, byte_count)
            .with_items(item_count, item_byte_count, item_offset);

        if let Some(format) = optional_text(object, FORMAT, &name)? {
            match FormatSpec::parse(format) {
                Ok(spec) => column = column.with_format(spec),
                Err(reason) => log::warn!("Column {name}: ignoring FORMAT: {reason}"),
            }
        }
        if let Some(units) = optional_text(object, UNITS, &name)? {
            column = column.with_units(units.trim());
        }
        if let Some(description) = optional_text(object, DESCRIPTION, &name)? {
            column = column.with_description(description);
        }

        column.valid_range = match self.overrides.valid_ranges.get(&name) {
            Some(range) => Some(*range),
            None => label_valid_range(object, &name)?,
        };

        for key in SENTINEL_KEYS {
            for value in object.get_all(key) {
                column = add_sentinels(column, value);
            }
        }
        for sentinel in self.overrides.invalid_for(&name) {
            column = column.with_invalid_constant(sentinel.clone());
        }

        Ok(column)
    }
}

fn add_sentinels(column: ColumnSchema, value: &LabelValue) -> ColumnSchema {
    match value {
        // Array columns may declare one sentinel per item.
        LabelValue::Sequence(values) => values.iter().fold(column, add_sentinels),
        _ => match Sentinel::from_label(value) {
            Some(sentinel) => column.with_invalid_constant(sentinel),
            None => column,
        },
    }
}

fn invalid_value(
    column: &str,
    key: &'static str,
    expected: &'static str,
    found: &LabelValue,
) -> SchemaError {
    SchemaError::InvalidKeyValue {
        column: column.to_string(),
        key,
        expected,
        found: found.to_string(),
    }
}

fn single<'a>(
    object: &'a LabelObject,
    key: &'static str,
    column: &str,
) -> Result<Option<&'a LabelValue>, SchemaError> {
    match object.count(key) {
        0 => Ok(None),
        1 => Ok(object.get(key)),
        count => Err(SchemaError::AmbiguousKey {
            column: column.to_string(),
            key,
            count,
        }),
    }
}

fn mandatory<'a>(
    object: &'a LabelObject,
    key: &'static str,
    column: &str,
) -> Result<&'a LabelValue, SchemaError> {
    single(object, key, column)?.ok_or_else(|| SchemaError::MissingKey {
        column: column.to_string(),
        key,
    })
}

fn as_usize(value: &LabelValue, column: &str, key: &'static str) -> Result<usize, SchemaError> {
    value
        .as_integer()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| invalid_value(column, key, "a non-negative integer", value))
}

fn optional_usize(
    object: &LabelObject,
    key: &'static str,
    column: &str,
) -> Result<Option<usize>, SchemaError> {
    single(object, key, column)?
        .map(|value| as_usize(value, column, key))
        .transpose()
}

fn optional_text<'a>(
    object: &'a LabelObject,
    key: &'static str,
    column: &str,
) -> Result<Option<&'a str>, SchemaError> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| invalid_value(column, key, "a text", value)),
    }
}

fn label_valid_range(object: &LabelObject, column: &str) -> Result<Option<ValidRange>, SchemaError> {
    let invalid = |reason: String| SchemaError::InvalidValidRange {
        column: column.to_string(),
        reason,
    };

    if let Some(value) = single(object, VALID_RANGE, column)? {
        let bounds = value
            .as_sequence()
            .filter(|values| values.len() == 2)
            .ok_or_else(|| invalid(format!("expected (min, max), found {value}")))?;
        let min = bounds[0]
            .as_f64()
            .ok_or_else(|| invalid(format!("non-numeric minimum {}", bounds[0])))?;
        let max = bounds[1]
            .as_f64()
            .ok_or_else(|| invalid(format!("non-numeric maximum {}", bounds[1])))?;
        return Ok(Some(ValidRange::new(min, max)));
    }

    let bound = |key: &'static str| -> Result<Option<f64>, SchemaError> {
        single(object, key, column)?
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| invalid(format!("non-numeric {key} {value}")))
            })
            .transpose()
    };
    match (bound(VALID_MINIMUM)?, bound(VALID_MAXIMUM)?) {
        (None, None) => Ok(None),
        (min, max) => Ok(Some(ValidRange::new(
            min.unwrap_or(f64::NEG_INFINITY),
            max.unwrap_or(f64::INFINITY),
        ))),
    }
}

#[cfg(test)]
mod schema_builder_test {
    use super::*;

    fn column(name: &str, data_type: &str, start: i64, bytes: i64) -> LabelObject {
        LabelObject::new()
            .with("OBJECT", LabelValue::symbol("COLUMN"))
            .with(NAME, name)
            .with(DATA_TYPE, LabelValue::symbol(data_type))
            .with(START_BYTE, start)
            .with(BYTES, bytes)
    }

    #[test]
    fn test_build_scalar_columns() {
        let columns = vec![
            column("NAME", "CHARACTER", 1, 5),
            column("COUNT", "ASCII_INTEGER", 7, 3).with(UNITS, "counts"),
        ];
        let schema = SchemaBuilder::new().build(&columns, 9, 1).unwrap();

        assert_eq!(schema.len(), 2);
        let count = schema.column("COUNT").unwrap();
        assert_eq!(count.data_type(), DataType::Integer);
        assert_eq!(count.start_byte(), 7);
        assert_eq!(count.item_count(), 1);
        assert_eq!(count.item_byte_count(), 3);
        assert_eq!(count.units(), Some("counts"));
        assert!(count.valid_range().is_none());
        assert!(count.invalid_constant().is_none());
    }

    #[test]
    fn test_build_array_column() {
        let columns = vec![column("VECTOR", "ASCII_REAL", 1, 23)
            .with(ITEMS, 2)
            .with(ITEM_BYTES, 11)
            .with(ITEM_OFFSET, 12)];
        let schema = SchemaBuilder::new().build(&columns, 23, 1).unwrap();
        let vector = &schema.columns()[0];
        assert_eq!(vector.item_count(), 2);
        assert_eq!(vector.item_window(1), 12..23);
    }

    #[test]
    fn test_item_bytes_default_divides_span() {
        let columns = vec![column("V", "ASCII_REAL", 1, 30).with(ITEMS, 3)];
        let schema = SchemaBuilder::new().build(&columns, 30, 1).unwrap();
        assert_eq!(schema.columns()[0].item_byte_count(), 10);
        assert_eq!(schema.columns()[0].item_offset(), 10);

        let columns = vec![column("V", "ASCII_REAL", 1, 31).with(ITEMS, 3)];
        assert!(matches!(
            SchemaBuilder::new().build(&columns, 31, 1),
            Err(SchemaError::ItemCount { .. })
        ));
    }

    #[test]
    fn test_missing_and_ambiguous_keys() {
        let no_bytes = LabelObject::new()
            .with(NAME, "X")
            .with(DATA_TYPE, LabelValue::symbol("CHARACTER"))
            .with(START_BYTE, 1);
        assert_eq!(
            SchemaBuilder::new().build([&no_bytes], 4, 1),
            Err(SchemaError::MissingKey {
                column: "X".into(),
                key: BYTES
            })
        );

        let no_name = LabelObject::new().with(DATA_TYPE, LabelValue::symbol("CHARACTER"));
        assert_eq!(
            SchemaBuilder::new().build([&no_name], 4, 1),
            Err(SchemaError::MissingKey {
                column: "#1".into(),
                key: NAME
            })
        );

        let twice = column("X", "CHARACTER", 1, 2).with(START_BYTE, 2);
        assert_eq!(
            SchemaBuilder::new().build([&twice], 4, 1),
            Err(SchemaError::AmbiguousKey {
                column: "X".into(),
                key: START_BYTE,
                count: 2
            })
        );

        let mistyped = column("X", "CHARACTER", 1, 2).with(ITEMS, "two");
        assert!(matches!(
            SchemaBuilder::new().build([&mistyped], 4, 1),
            Err(SchemaError::InvalidKeyValue { key: ITEMS, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_geometry_and_types() {
        let outside = column("X", "CHARACTER", 3, 4);
        assert!(matches!(
            SchemaBuilder::new().build([&outside], 5, 1),
            Err(SchemaError::OutOfBounds { .. })
        ));

        let zero_start = column("X", "CHARACTER", 0, 4);
        assert!(matches!(
            SchemaBuilder::new().build([&zero_start], 5, 1),
            Err(SchemaError::OutOfBounds { .. })
        ));

        let binary = column("X", "MSB_INTEGER", 1, 4);
        assert!(matches!(
            SchemaBuilder::new().build([&binary], 5, 1),
            Err(SchemaError::UnsupportedDataType { .. })
        ));

        let layout = column("X", "ASCII_REAL", 1, 22)
            .with(ITEMS, 2)
            .with(ITEM_BYTES, 11)
            .with(ITEM_OFFSET, 12);
        assert!(matches!(
            SchemaBuilder::new().build([&layout], 30, 1),
            Err(SchemaError::ItemLayout { needed: 23, .. })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_item_counts() {
        let huge = column("V", "ASCII_REAL", 1, 10)
            .with(ITEMS, 1i64 << 40)
            .with(ITEM_BYTES, 1)
            .with(ITEM_OFFSET, 1i64 << 40);
        assert!(matches!(
            SchemaBuilder::new().build([&huge], 10, 1),
            Err(SchemaError::ItemLayout { .. })
        ));

        let understated = column("V", "ASCII_REAL", 1, 20)
            .with(ITEMS, 2)
            .with(ITEM_BYTES, 5)
            .with(ITEM_OFFSET, 5);
        assert!(matches!(
            SchemaBuilder::new().build([&understated], 20, 1),
            Err(SchemaError::ItemCount { .. })
        ));
    }

    #[test]
    fn test_validity_keys() {
        let object = column("T", "ASCII_REAL", 1, 8)
            .with(VALID_RANGE, vec![LabelValue::from(2), LabelValue::from(3)])
            .with("INVALID_CONSTANT", LabelValue::real_literal("19.5").unwrap())
            .with("MISSING_CONSTANT", LabelValue::symbol("N/A"));
        let schema = SchemaBuilder::new().build([&object], 8, 1).unwrap();
        let t = &schema.columns()[0];

        assert_eq!(t.valid_range(), Some(&ValidRange::new(2.0, 3.0)));
        assert_eq!(t.invalid_constants().len(), 2);
        assert_eq!(t.invalid_constant().unwrap().literal(), "19.5");

        let object = column("T", "ASCII_REAL", 1, 8).with(VALID_MINIMUM, 0);
        let schema = SchemaBuilder::new().build([&object], 8, 1).unwrap();
        assert_eq!(
            schema.columns()[0].valid_range(),
            Some(&ValidRange::new(0.0, f64::INFINITY))
        );

        let object = column("T", "ASCII_REAL", 1, 8).with(VALID_RANGE, 4);
        assert!(matches!(
            SchemaBuilder::new().build([&object], 8, 1),
            Err(SchemaError::InvalidValidRange { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let columns = vec![
            column("A", "ASCII_REAL", 1, 4).with(VALID_RANGE, vec![0, 1]),
            column("B", "ASCII_REAL", 5, 4),
        ];
        let overrides = SchemaOverrides::new()
            .with_valid_range("A", -5.0, 5.0)
            .with_invalid("A", [-1i64])
            .with_default_invalid([Sentinel::real("-1.E32").unwrap()]);
        let schema = SchemaBuilder::new()
            .with_overrides(overrides)
            .build(&columns, 8, 1)
            .unwrap();

        let a = schema.column("A").unwrap();
        assert_eq!(a.valid_range(), Some(&ValidRange::new(-5.0, 5.0)));
        assert_eq!(a.invalid_constants(), &[Sentinel::Integer(-1)]);

        let b = schema.column("B").unwrap();
        assert_eq!(b.invalid_constants().len(), 1);
        assert_eq!(b.invalid_constant().unwrap().literal(), "-1.E32");
    }

    #[test]
    fn test_from_label() {
        let table = LabelObject::new()
            .with("OBJECT", LabelValue::symbol("TABLE"))
            .with(ROWS, 2)
            .with(ROW_BYTES, 12)
            .with("COLUMN", column("A", "CHARACTER", 1, 4))
            .with("COLUMN", column("B", "ASCII_INTEGER", 6, 5));
        let file = LabelObject::new()
            .with(RECORD_BYTES, 12)
            .with(FILE_RECORDS, 3);

        let schema = SchemaBuilder::new().from_label(&file, &table).unwrap();
        assert_eq!(schema.record_length(), 12);
        assert_eq!(schema.record_count(), 3);
        assert_eq!(schema.column_names().collect::<Vec<_>>(), ["A", "B"]);

        let schema = SchemaBuilder::new()
            .from_label(&LabelObject::new(), &table)
            .unwrap();
        assert_eq!(schema.record_count(), 2);

        assert_eq!(
            SchemaBuilder::new().from_label(&LabelObject::new(), &LabelObject::new()),
            Err(SchemaError::MissingTableKey(RECORD_BYTES))
        );
    }
}
