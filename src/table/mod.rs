//! # Assembled tables
//!
//! A [`Table`] is the read-only, columnar result of
//! [`TableAssembler::assemble`](crate::assemble::TableAssembler::assemble): for every
//! decoded column, one [`Field`] per accepted record, plus the source record index of
//! each row and the diagnostics gathered during assembly.
//!
//! Modules
//! -----------------
//! * [`lookup`] – Rows whose columns equal (or contain) given values.
//! * [`filename_index`] – Index tables: rows keyed by file name and volume.
//!
//! Validity masks
//! -----------------
//! [`Table::column_validity`] returns the per-item tags of a column, or one tag per row
//! when `merge` is set. Merging keeps the worst tag of the row's items, so a row with one
//! sentinel item is `INVALID_CONSTANT` as a whole.
pub mod filename_index;
pub mod lookup;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
    assemble::Diagnostic,
    constants::{FastHashMap, Field},
    decode::{validity::Validity, value::Value, Row},
    pdstable_errors::PdsTableError,
    schema::{column::ColumnSchema, TableSchema},
};

#[derive(Debug, Clone)]
pub struct Table {
    schema: Arc<TableSchema>,
    /// Schema position of each table column.
    positions: Vec<usize>,
    columns: Vec<Vec<Field>>,
    index: FastHashMap<String, usize>,
    source_rows: Vec<usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Table {
    pub(crate) fn new(
        schema: Arc<TableSchema>,
        positions: Vec<usize>,
        columns: Vec<Vec<Field>>,
        source_rows: Vec<usize>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let index = positions
            .iter()
            .enumerate()
            .map(|(i, &position)| (schema.columns()[position].name().to_string(), i))
            .collect();
        Table {
            schema,
            positions,
            columns,
            index,
            source_rows,
            diagnostics,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn row_count(&self) -> usize {
        self.source_rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Names of the table columns, in schema order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.table_columns().map(ColumnSchema::name)
    }

    fn table_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.positions.iter().map(|&p| &self.schema.columns()[p])
    }

    fn column_index(&self, name: &str) -> Result<usize, PdsTableError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PdsTableError::ColumnNotFound(name.to_string()))
    }

    pub fn column_schema(&self, name: &str) -> Result<&ColumnSchema, PdsTableError> {
        let i = self.column_index(name)?;
        Ok(&self.schema.columns()[self.positions[i]])
    }

    /// Every field of a column, one per row.
    pub fn column(&self, name: &str) -> Result<&[Field], PdsTableError> {
        let i = self.column_index(name)?;
        Ok(&self.columns[i])
    }

    /// The values of a column without their validity tags, one item list per row.
    pub fn column_values(&self, name: &str) -> Result<Vec<SmallVec<[&Value; 1]>>, PdsTableError> {
        Ok(self
            .column(name)?
            .iter()
            .map(|field| field.iter().map(|item| &item.value).collect())
            .collect())
    }

    /// Validity tags of a column.
    ///
    /// Arguments
    /// -----------------
    /// * `name` – Column name.
    /// * `merge` – Collapse the tags of a row's items into the single worst tag.
    ///
    /// Return
    /// ----------
    /// * One tag list per row: `item_count` tags, or exactly one when `merge` is set.
    ///
    /// See also
    /// ------------
    /// * [`Table::column_mask`] – The merged tags as a flat list.
    pub fn column_validity(
        &self,
        name: &str,
        merge: bool,
    ) -> Result<Vec<SmallVec<[Validity; 1]>>, PdsTableError> {
        let column = self.column(name)?;
        Ok(column
            .iter()
            .map(|field| {
                if merge {
                    smallvec::smallvec![merged_validity(field)]
                } else {
                    field.iter().map(|item| item.validity).collect()
                }
            })
            .collect())
    }

    /// One merged validity tag per row.
    pub fn column_mask(&self, name: &str) -> Result<Vec<Validity>, PdsTableError> {
        Ok(self.column(name)?.iter().map(merged_validity).collect())
    }

    /// Row `index` of the table.
    pub fn row(&self, index: usize) -> Result<Row, PdsTableError> {
        if index >= self.row_count() {
            return Err(PdsTableError::RowOutOfRange {
                index,
                rows: self.row_count(),
            });
        }
        Ok(self.build_row(index))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.row_count()).map(|index| self.build_row(index))
    }

    fn build_row(&self, index: usize) -> Row {
        Row::from_fields(
            self.column_names(),
            self.columns.iter().map(|c| c[index].clone()).collect(),
        )
    }

    /// Index of the source record that produced row `row`.
    pub fn source_index(&self, row: usize) -> Option<usize> {
        self.source_rows.get(row).copied()
    }

    pub fn source_indices(&self) -> &[usize] {
        &self.source_rows
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// A table restricted to the named columns (kept in schema order).
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, PdsTableError> {
        let mut selected = names
            .iter()
            .map(|name| self.column_index(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        selected.sort_unstable();
        selected.dedup();

        Ok(Table::new(
            Arc::clone(&self.schema),
            selected.iter().map(|&i| self.positions[i]).collect(),
            selected.iter().map(|&i| self.columns[i].clone()).collect(),
            self.source_rows.clone(),
            self.diagnostics.clone(),
        ))
    }

    /// A table holding the rows accepted by `predicate`, in order.
    pub fn filter<P>(&self, mut predicate: P) -> Table
    where
        P: FnMut(&Row) -> bool,
    {
        let kept = (0..self.row_count())
            .filter(|&index| predicate(&self.build_row(index)))
            .collect::<Vec<_>>();

        Table::new(
            Arc::clone(&self.schema),
            self.positions.clone(),
            self.columns
                .iter()
                .map(|column| kept.iter().map(|&i| column[i].clone()).collect())
                .collect(),
            kept.iter().map(|&i| self.source_rows[i]).collect(),
            self.diagnostics.clone(),
        )
    }
}

fn merged_validity(field: &Field) -> Validity {
    field
        .iter()
        .map(|item| item.validity)
        .fold(Validity::Valid, Validity::merge)
}
