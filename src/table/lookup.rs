//! Row lookup by column values.
//!
//! A row matches when, for every `(column, value)` criterion, the row's field in that
//! column is fully valid and its item(s) equal the value. Text comparisons can be made
//! case-insensitive, and listed columns match when the criterion is a substring of the
//! cell. Numeric criteria compare numerically, so `Value::Integer(3)` matches a REAL
//! cell holding `3.0`.
use itertools::Itertools;

use crate::{
    constants::FastHashSet,
    decode::{value::Value, Row},
    pdstable_errors::PdsTableError,
    table::Table,
};

#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Maximum number of rows returned; `None` returns every match.
    pub limit: Option<usize>,
    /// Compare text in lower case.
    pub case_insensitive: bool,
    /// Columns matched by substring instead of equality.
    pub substring_columns: FastHashSet<String>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    pub fn with_substring(mut self, column: impl Into<String>) -> Self {
        self.substring_columns.insert(column.into());
        self
    }
}

fn text_matches(cell: &str, wanted: &str, substring: bool, case_insensitive: bool) -> bool {
    if case_insensitive {
        let (cell, wanted) = (cell.to_lowercase(), wanted.to_lowercase());
        if substring {
            cell.contains(&wanted)
        } else {
            cell == wanted
        }
    } else if substring {
        cell.contains(wanted)
    } else {
        cell == wanted
    }
}

fn value_matches(cell: &Value, wanted: &Value, substring: bool, case_insensitive: bool) -> bool {
    match (cell.as_str(), wanted.as_str()) {
        (Some(cell), Some(wanted)) => text_matches(cell, wanted, substring, case_insensitive),
        (None, None) => match (cell.as_f64(), wanted.as_f64()) {
            (Some(cell), Some(wanted)) => cell == wanted,
            _ => false,
        },
        _ => false,
    }
}

impl Table {
    /// Indices of the rows matching every criterion.
    ///
    /// Arguments
    /// -----------------
    /// * `criteria` – `(column, value)` pairs, all of which must match.
    /// * `options` – Limit, case folding and substring columns.
    ///
    /// Return
    /// ----------
    /// * Matching row indices in table order, at most `options.limit` of them.
    /// * [`PdsTableError::ColumnNotFound`] for an unknown criterion column.
    ///
    /// Rows whose tested field holds any non-VALID item never match. For array columns
    /// every item must match.
    pub fn find_row_indices(
        &self,
        criteria: &[(&str, Value)],
        options: &FindOptions,
    ) -> Result<Vec<usize>, PdsTableError> {
        let tests = criteria
            .iter()
            .map(|(name, wanted)| {
                Ok((
                    self.column(name)?,
                    wanted,
                    options.substring_columns.contains(*name),
                ))
            })
            .collect::<Result<Vec<_>, PdsTableError>>()?;

        let limit = options.limit.unwrap_or(usize::MAX);
        let matches = (0..self.row_count())
            .filter(|&row| {
                tests.iter().all(|(column, wanted, substring)| {
                    let field = &column[row];
                    field.iter().all(|item| {
                        item.is_valid()
                            && value_matches(&item.value, wanted, *substring, options.case_insensitive)
                    })
                })
            })
            .take(limit)
            .collect();
        Ok(matches)
    }

    /// Index of the first row matching every criterion.
    ///
    /// Return
    /// ----------
    /// * [`PdsTableError::RowNotFound`] when no row matches.
    pub fn find_row_index(
        &self,
        criteria: &[(&str, Value)],
        options: &FindOptions,
    ) -> Result<usize, PdsTableError> {
        let options = FindOptions {
            limit: Some(1),
            ..options.clone()
        };
        self.find_row_indices(criteria, &options)?
            .first()
            .copied()
            .ok_or_else(|| {
                let description = criteria
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .join(", ");
                PdsTableError::RowNotFound(description)
            })
    }

    /// The rows matching every criterion.
    pub fn find_rows(
        &self,
        criteria: &[(&str, Value)],
        options: &FindOptions,
    ) -> Result<Vec<Row>, PdsTableError> {
        self.find_row_indices(criteria, options)?
            .into_iter()
            .map(|index| self.row(index))
            .collect()
    }
}
