//! # Record decoding
//!
//! [`RecordDecoder`] applies a [`TableSchema`] to one raw fixed-length record and
//! produces a [`Row`]: for every column, the sequence of its items parsed to their
//! declared type and tagged with a [`Validity`].
//!
//! ## Pipeline per item
//! -----------------
//! 1. Slice the item window `start_byte - 1 + item_offset * i .. + item_byte_count`.
//! 2. Read the bytes as Latin-1 text.
//! 3. Run the column's callback on the raw text, if any.
//! 4. Trim ASCII whitespace and NUL padding (TEXT and TIME columns listed in
//!    [`DecodeOptions::nostrip`] keep the raw text).
//! 5. Apply the column's textual replacements, if any.
//! 6. Parse: INTEGER as `i64`, REAL as `f64` (Fortran `D` exponents accepted, implied
//!    decimals from an `Fw.d` format honored), TEXT and TIME kept as text.
//! 7. Classify with [`ValidityClassifier`].
//!
//! A field that does not parse as its type but equals one of the column's sentinels is
//! kept as [`Value::Text`] tagged [`Validity::InvalidConstant`]. Any other parse failure
//! is a [`DecodeError::ValueDecode`].
//!
//! Decoding is a pure function of the record and the schema, so the assembler can run
//! it from several threads on a shared `Arc<TableSchema>`.
//!
//! ## Example
//! -----------------
//! ```rust
//! use pdstable::decode::decode;
//! use pdstable::schema::{column::{ColumnSchema, DataType}, TableSchema};
//!
//! let schema = TableSchema::new(
//!     9,
//!     1,
//!     vec![
//!         ColumnSchema::new("NAME", DataType::Text, 1, 5),
//!         ColumnSchema::new("COUNT", DataType::Integer, 7, 3),
//!     ],
//! )
//! .unwrap();
//!
//! let row = decode(b"ALPHA  42", &schema).unwrap();
//! assert_eq!(row.get("COUNT").unwrap()[0].value.as_i64(), Some(42));
//! ```
pub mod validity;
pub mod value;

use std::{borrow::Cow, sync::Arc};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{FastHashMap, FastHashSet, Field},
    decode::{
        validity::{Validity, ValidityClassifier},
        value::{DecodedValue, Value},
    },
    pdstable_errors::{DecodeError, PdsTableError},
    schema::{
        column::{ColumnSchema, DataType},
        TableSchema,
    },
};

/// The decoded fields of one record, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    entries: Vec<(String, Field)>,
}

impl Row {
    pub(crate) fn from_fields<'a>(names: impl Iterator<Item = &'a str>, fields: Vec<Field>) -> Self {
        Row {
            entries: names.map(str::to_string).zip(fields).collect(),
        }
    }

    /// Field of the named column.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.entries
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, field)| field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries
            .iter()
            .map(|(column, field)| (column.as_str(), field))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(column, _)| column.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self.entries.iter().map(|(column, field)| {
            if field.len() == 1 {
                format!("{column}={}", field[0])
            } else {
                format!("{column}=[{}]", field.iter().join(", "))
            }
        });
        write!(f, "{}", fields.format(", "))
    }
}

type RepairFn = dyn for<'a> Fn(&'a str) -> Cow<'a, str> + Send + Sync;

/// Repair function run on the raw text of every item of a column, before trimming and
/// replacements. Used to fix known syntax errors of a table.
#[derive(Clone)]
pub struct ColumnCallback(Arc<RepairFn>);

impl ColumnCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> Cow<'a, str> + Send + Sync + 'static,
    {
        ColumnCallback(Arc::new(callback))
    }

    pub fn apply<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        (self.0)(raw)
    }
}

impl std::fmt::Debug for ColumnCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ColumnCallback(..)")
    }
}

/// Per-decoder options.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Decode only these columns (schema order is kept). `None` or an empty list decodes
    /// every column.
    pub columns: Option<Vec<String>>,
    /// TEXT and TIME columns whose raw text is kept without trimming.
    pub nostrip: FastHashSet<String>,
    /// Whole-value replacements applied to the trimmed text of a column before parsing.
    pub replacements: FastHashMap<String, Vec<(String, String)>>,
    /// Repair functions applied to the raw text of a column before replacements.
    pub callbacks: FastHashMap<String, ColumnCallback>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_nostrip(mut self, column: impl Into<String>) -> Self {
        self.nostrip.insert(column.into());
        self
    }

    pub fn with_replacement(
        mut self,
        column: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.replacements
            .entry(column.into())
            .or_default()
            .push((from.into(), to.into()));
        self
    }

    /// Run `callback` on the raw text of every item of `column` before it is parsed.
    ///
    /// ```rust
    /// use std::borrow::Cow;
    /// use pdstable::decode::DecodeOptions;
    ///
    /// // A table that writes the letter O for a zero.
    /// let options = DecodeOptions::new().with_callback("COUNT", |raw: &str| {
    ///     if raw.contains('O') {
    ///         Cow::Owned(raw.replace('O', "0"))
    ///     } else {
    ///         Cow::Borrowed(raw)
    ///     }
    /// });
    /// assert!(options.callbacks.contains_key("COUNT"));
    /// ```
    pub fn with_callback<F>(mut self, column: impl Into<String>, callback: F) -> Self
    where
        F: for<'a> Fn(&'a str) -> Cow<'a, str> + Send + Sync + 'static,
    {
        self.callbacks
            .insert(column.into(), ColumnCallback::new(callback));
        self
    }
}

/// Resolved decode rules of one selected column.
#[derive(Debug, Clone)]
struct ColumnPlan {
    position: usize,
    strip: bool,
    replacements: Vec<(String, String)>,
    callback: Option<ColumnCallback>,
}

impl ColumnPlan {
    fn plain(position: usize) -> Self {
        ColumnPlan {
            position,
            strip: true,
            replacements: Vec::new(),
            callback: None,
        }
    }
}

/// Decodes raw records against a shared schema.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    schema: Arc<TableSchema>,
    plans: Vec<ColumnPlan>,
}

impl RecordDecoder {
    /// Resolve the decode options against the schema.
    ///
    /// Return
    /// ----------
    /// * [`PdsTableError::ColumnNotFound`] when a selected, `nostrip`, replacement or
    ///   callback column is not part of the schema.
    pub fn new(schema: Arc<TableSchema>, options: DecodeOptions) -> Result<Self, PdsTableError> {
        let DecodeOptions {
            columns,
            nostrip,
            mut replacements,
            mut callbacks,
        } = options;

        for name in nostrip
            .iter()
            .chain(replacements.keys())
            .chain(callbacks.keys())
        {
            if schema.position(name).is_none() {
                return Err(PdsTableError::ColumnNotFound(name.clone()));
            }
        }

        let positions = match columns {
            Some(names) if !names.is_empty() => {
                let mut positions = names
                    .iter()
                    .map(|name| {
                        schema
                            .position(name)
                            .ok_or_else(|| PdsTableError::ColumnNotFound(name.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                positions.sort_unstable();
                positions.dedup();
                positions
            }
            _ => (0..schema.len()).collect::<Vec<_>>(),
        };

        let plans = positions
            .into_iter()
            .map(|position| {
                let column = &schema.columns()[position];
                ColumnPlan {
                    position,
                    strip: column.data_type().is_numeric() || !nostrip.contains(column.name()),
                    replacements: replacements.remove(column.name()).unwrap_or_default(),
                    callback: callbacks.remove(column.name()),
                }
            })
            .collect();

        Ok(RecordDecoder { schema, plans })
    }

    /// A decoder of every column with default options.
    pub fn for_schema(schema: Arc<TableSchema>) -> Self {
        let plans = (0..schema.len()).map(ColumnPlan::plain).collect();
        RecordDecoder { schema, plans }
    }

    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Schema positions of the decoded columns, in order.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.plans.iter().map(|plan| plan.position)
    }

    /// The decoded columns, in order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSchema> + '_ {
        self.positions().map(|i| &self.schema.columns()[i])
    }

    /// Decode one record, failing on the first error.
    ///
    /// Arguments
    /// -----------------
    /// * `raw` – The record bytes; must be exactly `record_length` long.
    ///
    /// Return
    /// ----------
    /// * The decoded [`Row`].
    /// * [`DecodeError::RecordLength`] or the first [`DecodeError::ValueDecode`].
    ///
    /// See also
    /// ------------
    /// * [`RecordDecoder::decode_lenient`] – Collects value errors instead of failing.
    pub fn decode(&self, raw: &[u8]) -> Result<Row, DecodeError> {
        let fields = self.decode_fields(raw)?;
        Ok(Row::from_fields(self.columns().map(ColumnSchema::name), fields))
    }

    /// Decode one record, substituting placeholders for items that fail to parse.
    ///
    /// A wrong record length is still an error since no field window can be trusted.
    pub fn decode_lenient(&self, raw: &[u8]) -> Result<(Row, Vec<DecodeError>), DecodeError> {
        let (fields, errors) = self.decode_fields_lenient(raw)?;
        Ok((
            Row::from_fields(self.columns().map(ColumnSchema::name), fields),
            errors,
        ))
    }

    pub(crate) fn decode_fields(&self, raw: &[u8]) -> Result<Vec<Field>, DecodeError> {
        decode_fields(&self.schema, &self.plans, raw)
    }

    pub(crate) fn decode_fields_lenient(
        &self,
        raw: &[u8],
    ) -> Result<(Vec<Field>, Vec<DecodeError>), DecodeError> {
        check_length(&self.schema, raw)?;
        let mut errors = Vec::new();
        let fields = self
            .plans
            .iter()
            .map(|plan| {
                let column = &self.schema.columns()[plan.position];
                (0..column.item_count())
                    .map(|item| {
                        decode_item(column, plan, item, raw).unwrap_or_else(|err| {
                            errors.push(err);
                            DecodedValue::placeholder()
                        })
                    })
                    .collect::<Field>()
            })
            .collect();
        Ok((fields, errors))
    }
}

fn check_length(schema: &TableSchema, raw: &[u8]) -> Result<(), DecodeError> {
    let expected = schema.record_length();
    if raw.len() != expected {
        return Err(DecodeError::RecordLength {
            expected,
            actual: raw.len(),
        });
    }
    Ok(())
}

fn decode_fields(
    schema: &TableSchema,
    plans: &[ColumnPlan],
    raw: &[u8],
) -> Result<Vec<Field>, DecodeError> {
    check_length(schema, raw)?;
    plans
        .iter()
        .map(|plan| {
            let column = &schema.columns()[plan.position];
            (0..column.item_count())
                .map(|item| decode_item(column, plan, item, raw))
                .collect::<Result<Field, _>>()
        })
        .collect()
}

/// Decode one record against a schema with default options.
pub fn decode(raw: &[u8], schema: &TableSchema) -> Result<Row, DecodeError> {
    let plans = (0..schema.len()).map(ColumnPlan::plain).collect::<Vec<_>>();
    let fields = decode_fields(schema, &plans, raw)?;
    Ok(Row::from_fields(schema.column_names(), fields))
}

fn is_padding(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\0'
}

/// Latin-1 view of a byte window.
fn latin1(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) if bytes.is_ascii() => Cow::Borrowed(text),
        _ => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

fn decode_item(
    column: &ColumnSchema,
    plan: &ColumnPlan,
    item: usize,
    raw: &[u8],
) -> Result<DecodedValue, DecodeError> {
    let window = latin1(&raw[column.item_window(item)]);
    let repaired;
    let window = match &plan.callback {
        Some(callback) => {
            repaired = callback.apply(&window);
            repaired.as_ref()
        }
        None => window.as_ref(),
    };
    let mut text = if plan.strip {
        window.trim_matches(is_padding)
    } else {
        window
    };
    if let Some((_, to)) = plan.replacements.iter().find(|(from, _)| from == text) {
        text = to.as_str();
    }

    let parsed = match column.data_type() {
        DataType::Text => Some(Value::Text(text.to_string())),
        DataType::Time => Some(Value::Time(text.to_string())),
        DataType::Integer => text.parse::<i64>().ok().map(Value::Integer),
        DataType::Real => parse_real(text, column).map(Value::Real),
    };

    match parsed {
        Some(value) => {
            let validity =
                ValidityClassifier::classify(&value, column.invalid_constants(), column.valid_range());
            Ok(DecodedValue::new(value, validity))
        }
        None if column
            .invalid_constants()
            .iter()
            .any(|sentinel| sentinel.matches_text(text)) =>
        {
            Ok(DecodedValue::new(
                Value::Text(text.to_string()),
                Validity::InvalidConstant,
            ))
        }
        None => Err(DecodeError::ValueDecode {
            column: column.name().to_string(),
            item,
            raw: text.to_string(),
            data_type: column.data_type(),
        }),
    }
}

/// Parse an ASCII real, Fortran `D` exponents included.
///
/// A field written without a decimal point or exponent in an `Fw.d` column carries `d`
/// implied decimals.
fn parse_real(text: &str, column: &ColumnSchema) -> Option<f64> {
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = if text.contains(['D', 'd']) {
        text.replace(['D', 'd'], "E").parse::<f64>().ok()?
    } else {
        text.parse::<f64>().ok()?
    };

    match column.format_spec().and_then(|f| f.implied_decimals()) {
        Some(decimals) if !text.contains(['.', 'E', 'e', 'D', 'd']) => {
            Some(value / 10f64.powi(decimals as i32))
        }
        _ => Some(value),
    }
}
