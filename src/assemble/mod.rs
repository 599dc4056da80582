//! # Table assembly
//!
//! [`TableAssembler`] drives a [`RecordDecoder`] over every record of a data file and
//! gathers the decoded fields into a columnar [`Table`].
//!
//! ## Modes
//! -----------------
//! * [`AssemblyMode::Strict`] – the first record-length error, value decode error or
//!   record-count mismatch aborts assembly with a [`PdsTableError`].
//! * [`AssemblyMode::Lenient`] – records of the wrong length are dropped, items that
//!   fail to parse are replaced by an `Absent`/`INVALID_CONSTANT` placeholder, and a
//!   record-count mismatch is only reported. Every such event becomes a [`Diagnostic`]
//!   carrying the index of the **source** record.
//!
//! ## Batching and parallelism
//! -----------------
//! Records are pulled from the input in batches of [`AssemblyOptions::batch_size`].
//! With the `parallel` feature each batch is decoded on a rayon pool; results are
//! merged back in record order, so the resulting table and the diagnostics are the same
//! whatever the thread count. [`TableAssembler::assemble_with_cancel`] polls a
//! cancellation callback before every batch.
//!
//! ## Logging
//! -----------------
//! A `warn` summary is logged per column that held unparsable values (count and first
//! example), and once for a record-count mismatch.
//!
//! ## Example
//! -----------------
//! ```rust
//! use pdstable::assemble::{AssemblyMode, AssemblyOptions, TableAssembler};
//! use pdstable::schema::{column::{ColumnSchema, DataType}, TableSchema};
//!
//! let schema = TableSchema::new(
//!     4,
//!     2,
//!     vec![ColumnSchema::new("N", DataType::Integer, 1, 3)],
//! )
//! .unwrap();
//!
//! let records: [&[u8]; 2] = [b" 12\n", b"abc\n"];
//! let table = TableAssembler::new(AssemblyOptions::new().with_mode(AssemblyMode::Lenient))
//!     .assemble(records, schema)
//!     .unwrap();
//!
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.diagnostics().len(), 1);
//! ```
#[cfg(feature = "parallel")]
mod parallel;
#[cfg(feature = "progress")]
pub mod progress_bar;

use std::{ops::Range, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{FastHashMap, Field, DEFAULT_BATCH_SIZE},
    decode::{DecodeOptions, RecordDecoder},
    pdstable_errors::{DecodeError, PdsTableError},
    schema::TableSchema,
    table::Table,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyMode {
    #[default]
    Strict,
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A record whose length differs from the schema's; the record was dropped.
    RecordLength,
    /// An item that could not be parsed; a placeholder was stored.
    ValueDecode,
    /// The number of records read differs from the declared count.
    RecordCount,
}

/// A non-fatal problem met during lenient assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Index of the source record, `None` for table-level diagnostics.
    pub row_index: Option<usize>,
    pub column: Option<String>,
    pub message: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    fn from_decode_error(row_index: usize, error: &DecodeError) -> Self {
        let (column, kind) = match error {
            DecodeError::RecordLength { .. } => (None, DiagnosticKind::RecordLength),
            DecodeError::ValueDecode { column, .. } => {
                (Some(column.clone()), DiagnosticKind::ValueDecode)
            }
        };
        Diagnostic {
            row_index: Some(row_index),
            column,
            message: error.to_string(),
            kind,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row_index {
            Some(row) => write!(f, "record {row}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Options of one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub mode: AssemblyMode,
    pub decode: DecodeOptions,
    /// Source records to read, as a half-open range of record indices.
    pub row_range: Option<Range<usize>>,
    /// Records decoded per batch, at least 1.
    pub batch_size: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        AssemblyOptions {
            mode: AssemblyMode::Strict,
            decode: DecodeOptions::default(),
            row_range: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl AssemblyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: AssemblyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_row_range(mut self, row_range: Range<usize>) -> Self {
        self.row_range = Some(row_range);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Outcome of decoding one record: its fields and the item errors met (lenient only).
type RecordOutcome = Result<(Vec<Field>, Vec<DecodeError>), DecodeError>;

/// Count and first occurrence of unparsable values in one column.
struct IllegalValues {
    count: usize,
    first_row: usize,
    first_raw: String,
}

#[derive(Debug, Clone, Default)]
pub struct TableAssembler {
    options: AssemblyOptions,
}

impl TableAssembler {
    pub fn new(options: AssemblyOptions) -> Self {
        TableAssembler { options }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Decode every record into a [`Table`].
    ///
    /// Arguments
    /// -----------------
    /// * `records` – Raw records in file order (e.g. [`FixedLengthRecords`](crate::records::FixedLengthRecords)).
    /// * `schema` – The decode plan, shared with the resulting table.
    ///
    /// Return
    /// ----------
    /// * The assembled [`Table`]; in lenient mode its [`Table::diagnostics`] list every
    ///   dropped record and substituted item.
    /// * In strict mode, the first failure as [`PdsTableError::Record`] (with the source
    ///   record index) or [`PdsTableError::RecordCountMismatch`].
    /// * [`PdsTableError::ColumnNotFound`] when the decode options name unknown columns.
    ///
    /// See also
    /// ------------
    /// * [`TableAssembler::assemble_with_cancel`] – Same, with cooperative cancellation.
    pub fn assemble<I, R>(
        &self,
        records: I,
        schema: impl Into<Arc<TableSchema>>,
    ) -> Result<Table, PdsTableError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]> + Sync,
    {
        self.assemble_with_cancel(records, schema, || false)
    }

    /// Cooperative cancellation version: `should_cancel` is called before every batch and
    /// assembly stops with [`PdsTableError::Cancelled`] as soon as it returns `true`.
    pub fn assemble_with_cancel<I, R, F>(
        &self,
        records: I,
        schema: impl Into<Arc<TableSchema>>,
        mut should_cancel: F,
    ) -> Result<Table, PdsTableError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]> + Sync,
        F: FnMut() -> bool,
    {
        let schema: Arc<TableSchema> = schema.into();
        let decoder = RecordDecoder::new(Arc::clone(&schema), self.options.decode.clone())?;
        let mode = self.options.mode;
        let batch_size = self.options.batch_size.max(1);
        let expected = self.expected_records(&schema);

        log::debug!(
            "Assembling {} of {} columns, record length {}, {} records expected ({mode:?})",
            decoder.positions().count(),
            schema.len(),
            schema.record_length(),
            expected
        );

        let mut columns: Vec<Vec<Field>> = vec![Vec::new(); decoder.positions().count()];
        let mut source_rows = Vec::new();
        let mut diagnostics = Vec::new();
        let mut illegal: FastHashMap<String, IllegalValues> = FastHashMap::default();
        let mut supplied = 0usize;

        let (skip, take) = match &self.options.row_range {
            Some(range) => (range.start, range.end.saturating_sub(range.start)),
            None => (0, usize::MAX),
        };
        let mut records = records.into_iter().enumerate().skip(skip).take(take);

        #[cfg(feature = "progress")]
        let mut progress = progress_bar::BatchProgress::new(expected);

        loop {
            if should_cancel() {
                #[cfg(feature = "progress")]
                progress.interrupted();
                log::debug!("Assembly cancelled after {supplied} records");
                return Err(PdsTableError::Cancelled {
                    completed: supplied,
                });
            }

            let batch = records.by_ref().take(batch_size).collect::<Vec<_>>();
            if batch.is_empty() {
                break;
            }
            supplied += batch.len();

            for ((row, _), outcome) in batch.iter().zip(decode_batch(&decoder, &batch, mode)) {
                match (mode, outcome) {
                    (_, Ok((fields, errors))) => {
                        for error in &errors {
                            note_illegal(&mut illegal, *row, error);
                            diagnostics.push(Diagnostic::from_decode_error(*row, error));
                        }
                        for (column, field) in columns.iter_mut().zip(fields) {
                            column.push(field);
                        }
                        source_rows.push(*row);
                    }
                    (AssemblyMode::Strict, Err(source)) => {
                        #[cfg(feature = "progress")]
                        progress.finish();
                        return Err(PdsTableError::Record { row: *row, source });
                    }
                    (AssemblyMode::Lenient, Err(error)) => {
                        diagnostics.push(Diagnostic::from_decode_error(*row, &error));
                    }
                }
            }

            #[cfg(feature = "progress")]
            progress.batch_done(batch.len());
        }

        #[cfg(feature = "progress")]
        progress.finish();

        for column in decoder.columns() {
            if let Some(summary) = illegal.get(column.name()) {
                log::warn!(
                    "Column {}: {} illegal value(s), first {:?} in record {}",
                    column.name(),
                    summary.count,
                    summary.first_raw,
                    summary.first_row
                );
            }
        }

        if supplied != expected {
            let mismatch = PdsTableError::RecordCountMismatch {
                declared: expected,
                actual: supplied,
            };
            if mode == AssemblyMode::Strict {
                return Err(mismatch);
            }
            log::warn!("{mismatch}");
            diagnostics.push(Diagnostic {
                row_index: None,
                column: None,
                message: mismatch.to_string(),
                kind: DiagnosticKind::RecordCount,
            });
        }

        let dropped = supplied - source_rows.len();
        if dropped > 0 {
            log::warn!("Dropped {dropped} record(s) of the wrong length");
        }

        Ok(Table::new(
            schema,
            decoder.positions().collect(),
            columns,
            source_rows,
            diagnostics,
        ))
    }

    /// Number of records the label promises within the requested range.
    fn expected_records(&self, schema: &TableSchema) -> usize {
        let declared = schema.record_count();
        match &self.options.row_range {
            Some(range) => range.end.min(declared).saturating_sub(range.start.min(declared)),
            None => declared,
        }
    }
}

fn note_illegal(illegal: &mut FastHashMap<String, IllegalValues>, row: usize, error: &DecodeError) {
    if let DecodeError::ValueDecode { column, raw, .. } = error {
        illegal
            .entry(column.clone())
            .and_modify(|summary| summary.count += 1)
            .or_insert_with(|| IllegalValues {
                count: 1,
                first_row: row,
                first_raw: raw.clone(),
            });
    }
}

fn decode_one<R: AsRef<[u8]>>(decoder: &RecordDecoder, raw: &R, mode: AssemblyMode) -> RecordOutcome {
    match mode {
        AssemblyMode::Strict => decoder
            .decode_fields(raw.as_ref())
            .map(|fields| (fields, Vec::new())),
        AssemblyMode::Lenient => decoder.decode_fields_lenient(raw.as_ref()),
    }
}

#[cfg(feature = "parallel")]
fn decode_batch<R: AsRef<[u8]> + Sync>(
    decoder: &RecordDecoder,
    batch: &[(usize, R)],
    mode: AssemblyMode,
) -> Vec<RecordOutcome> {
    use rayon::prelude::*;

    match parallel::rayon_pool() {
        Some(pool) if batch.len() > 1 => pool.install(|| {
            batch
                .par_iter()
                .map(|(_, raw)| decode_one(decoder, raw, mode))
                .collect()
        }),
        _ => batch
            .iter()
            .map(|(_, raw)| decode_one(decoder, raw, mode))
            .collect(),
    }
}

#[cfg(not(feature = "parallel"))]
fn decode_batch<R: AsRef<[u8]> + Sync>(
    decoder: &RecordDecoder,
    batch: &[(usize, R)],
    mode: AssemblyMode,
) -> Vec<RecordOutcome> {
    batch
        .iter()
        .map(|(_, raw)| decode_one(decoder, raw, mode))
        .collect()
}

#[cfg(test)]
mod assemble_test {
    use super::*;
    use crate::{
        decode::{validity::Validity, value::Value},
        schema::column::{ColumnSchema, DataType},
    };

    fn schema(record_count: usize) -> TableSchema {
        TableSchema::new(
            8,
            record_count,
            vec![
                ColumnSchema::new("NAME", DataType::Text, 1, 3),
                ColumnSchema::new("N", DataType::Integer, 5, 3).with_invalid_constant(-99i64),
            ],
        )
        .unwrap()
    }

    const RECORDS: [&[u8]; 3] = [b"abc  12\n", b"def -99\n", b"ghi  x3\n"];

    #[test]
    fn test_strict_stops_at_first_error() {
        let result = TableAssembler::default().assemble(RECORDS, schema(3));
        assert_eq!(result.unwrap_err().row(), Some(2));

        let table = TableAssembler::default()
            .assemble(&RECORDS[..2], schema(2))
            .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column_mask("N").unwrap(),
            [Validity::Valid, Validity::InvalidConstant]
        );
    }

    #[test]
    fn test_lenient_placeholder_and_short_record() {
        let records: [&[u8]; 4] = [b"abc  12\n", b"ghi  x3\n", b"short\n", b"jkl   7\n"];
        let table = TableAssembler::new(AssemblyOptions::new().with_mode(AssemblyMode::Lenient))
            .assemble(records, schema(4))
            .unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.source_index(2), Some(3));
        assert_eq!(table.column("N").unwrap()[1][0].value, Value::Absent);

        let kinds = table
            .diagnostics()
            .iter()
            .map(|d| (d.row_index, d.kind))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            [
                (Some(1), DiagnosticKind::ValueDecode),
                (Some(2), DiagnosticKind::RecordLength)
            ]
        );
        assert_eq!(table.diagnostics()[0].column.as_deref(), Some("N"));
    }

    #[test]
    fn test_record_count_mismatch() {
        let strict = TableAssembler::default().assemble(&RECORDS[..2], schema(5));
        assert_eq!(
            strict.unwrap_err(),
            PdsTableError::RecordCountMismatch {
                declared: 5,
                actual: 2
            }
        );

        let lenient = TableAssembler::new(AssemblyOptions::new().with_mode(AssemblyMode::Lenient))
            .assemble(&RECORDS[..2], schema(5))
            .unwrap();
        assert_eq!(lenient.diagnostics().len(), 1);
        assert_eq!(lenient.diagnostics()[0].kind, DiagnosticKind::RecordCount);
        assert_eq!(lenient.diagnostics()[0].row_index, None);
    }

    #[test]
    fn test_row_range_and_small_batches() {
        let options = AssemblyOptions::new()
            .with_row_range(1..2)
            .with_batch_size(1);
        let table = TableAssembler::new(options)
            .assemble(RECORDS, schema(3))
            .unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.source_index(0), Some(1));
        assert_eq!(table.column("NAME").unwrap()[0][0].value, Value::from("def"));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let records: Vec<Vec<u8>> = (0..40)
            .map(|i| match i % 7 {
                3 => format!("r{i:02}  x{}\n", i % 10).into_bytes(),
                5 => format!("r{i:02} 1\n").into_bytes(),
                _ => format!("r{i:02} {:>3}\n", i * 3 - 20).into_bytes(),
            })
            .collect();
        let lenient = AssemblyOptions::new().with_mode(AssemblyMode::Lenient);

        // Single-record batches never reach the pool.
        let sequential = TableAssembler::new(lenient.clone().with_batch_size(1))
            .assemble(&records, schema(40))
            .unwrap();
        let parallel = TableAssembler::new(lenient.with_batch_size(16))
            .assemble(&records, schema(40))
            .unwrap();

        assert_eq!(parallel.row_count(), 35);
        assert_eq!(parallel.source_indices(), sequential.source_indices());
        assert_eq!(parallel.diagnostics(), sequential.diagnostics());
        for name in ["NAME", "N"] {
            assert_eq!(parallel.column(name).unwrap(), sequential.column(name).unwrap());
        }
    }

    #[test]
    fn test_cancel_between_batches() {
        let mut polls = 0;
        let result = TableAssembler::new(AssemblyOptions::new().with_batch_size(1))
            .assemble_with_cancel(RECORDS, schema(3), || {
                polls += 1;
                polls > 2
            });
        assert_eq!(result.unwrap_err(), PdsTableError::Cancelled { completed: 2 });
    }
}
