//! # File-name lookups in index tables
//!
//! PDS index tables list one product per row, with a file-specification column
//! (`FILE_SPECIFICATION_NAME`, `FILE_NAME`, `PRODUCT_ID`, ...) and often a volume
//! column (`VOLUME_ID`, `VOLUME_NAME`). This module finds rows from a file path.
//!
//! ## Filename keys
//! -----------------
//! The key of a file specification is its basename without extension, optionally
//! truncated to `keylen` characters: `data/c1234567_geom.lbl` → `c1234567_geom`.
//! [`FilenameIndex`] maps lower-cased keys to row indices so lookups ignore case and
//! extension.
//!
//! ## Volume + filespec search
//! -----------------
//! [`Table::find_row_indices_by_volume_filespec`] rewrites the requested path into the
//! shape used by the table, judged from the first tabulated file specification:
//! * a VMS-style example (`[DIR.SUB]FILE.IMG`) turns `dir/sub/file` into `[dir.sub]file`;
//! * an example without directories keeps only the basename of the request;
//! * the request's extension is replaced by the example's (dropped for substring search).
//!
//! The comparison is case-insensitive. The volume criterion only applies when the table
//! has a volume column and a non-empty volume id is given.
use camino::Utf8Path;

use crate::{
    constants::{FastHashMap, FILE_SPECIFICATION_COLUMN_NAMES, VOLUME_ID_COLUMN_NAMES},
    decode::value::Value,
    pdstable_errors::PdsTableError,
    table::{lookup::FindOptions, Table},
};

/// Key of a file specification: basename without extension, truncated to `keylen`
/// characters when given.
pub fn filename_key(filespec: &str, keylen: Option<usize>) -> String {
    let stem = Utf8Path::new(filespec).file_stem().unwrap_or_default();
    match keylen {
        Some(keylen) if keylen > 0 => stem.chars().take(keylen).collect(),
        _ => stem.to_string(),
    }
}

/// Split off the extension of the last path component, leading dots excepted.
fn split_extension(filespec: &str) -> (&str, &str) {
    let base_start = filespec.rfind('/').map_or(0, |i| i + 1);
    let base = &filespec[base_start..];
    match base.rfind('.') {
        Some(dot) if base[..dot].chars().any(|c| c != '.') => filespec.split_at(base_start + dot),
        _ => (filespec, ""),
    }
}

/// Row indices keyed by lower-cased filename key.
#[derive(Debug, Clone, Default)]
pub struct FilenameIndex {
    keys: Vec<String>,
    rows: FastHashMap<String, Vec<usize>>,
}

impl FilenameIndex {
    /// Distinct keys, in first-seen order and original case.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rows whose file specification has this key (case-insensitive).
    pub fn row_indices(&self, key: &str) -> &[usize] {
        self.rows
            .get(&key.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Table {
    fn find_column(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|candidate| {
            self.column_names()
                .find(|name| name.eq_ignore_ascii_case(candidate))
        })
    }

    /// Name of the column holding file specifications, if any.
    pub fn filespec_column(&self) -> Option<&str> {
        self.find_column(&FILE_SPECIFICATION_COLUMN_NAMES)
    }

    /// Name of the column holding volume identifiers, if any.
    pub fn volume_column(&self) -> Option<&str> {
        self.find_column(&VOLUME_ID_COLUMN_NAMES)
    }

    fn require_filespec_column(&self) -> Result<&str, PdsTableError> {
        self.filespec_column().ok_or_else(|| {
            PdsTableError::ColumnNotFound(FILE_SPECIFICATION_COLUMN_NAMES[0].to_string())
        })
    }

    /// Index the rows by the filename key of their file specification.
    ///
    /// Rows whose file specification is not valid are left out.
    pub fn index_rows_by_filename_key(
        &self,
        keylen: Option<usize>,
    ) -> Result<FilenameIndex, PdsTableError> {
        let column = self.column(self.require_filespec_column()?)?;

        let mut index = FilenameIndex::default();
        for (row, field) in column.iter().enumerate() {
            let Some(filespec) = field
                .first()
                .filter(|item| item.is_valid())
                .and_then(|item| item.value.as_str())
            else {
                continue;
            };
            let key = filename_key(filespec, keylen);
            let rows = index.rows.entry(key.to_lowercase()).or_default();
            if rows.is_empty() {
                index.keys.push(key);
            }
            rows.push(row);
        }
        Ok(index)
    }

    /// Rows whose volume id and file specification match.
    ///
    /// Arguments
    /// -----------------
    /// * `volume_id` – Volume to match; ignored when empty or when the table has no
    ///   volume column.
    /// * `filespec` – Path of the product, any extension.
    /// * `limit` – Maximum number of rows returned.
    /// * `substring` – Match rows whose file specification contains `filespec`.
    ///
    /// Return
    /// ----------
    /// * Matching row indices, or [`PdsTableError::ColumnNotFound`] when the table has
    ///   no file-specification column.
    pub fn find_row_indices_by_volume_filespec(
        &self,
        volume_id: Option<&str>,
        filespec: &str,
        limit: Option<usize>,
        substring: bool,
    ) -> Result<Vec<usize>, PdsTableError> {
        let filespec_column = self.require_filespec_column()?;
        let Some(example) = self.column(filespec_column)?.first() else {
            return Ok(Vec::new());
        };
        let example = example
            .first()
            .and_then(|item| item.value.as_str())
            .unwrap_or_default();

        let mut wanted = if example.contains('[') {
            let (dirs, name) = filespec.rsplit_once('/').unwrap_or(("", filespec));
            format!("[{}]{name}", dirs.replace('/', "."))
        } else if !example.contains('/') {
            filespec.rsplit('/').next().unwrap_or(filespec).to_string()
        } else {
            filespec.to_string()
        };
        wanted.truncate(split_extension(&wanted).0.len());
        if !substring {
            wanted.push_str(split_extension(example).1);
        }

        let mut options = FindOptions::new().case_insensitive();
        options.limit = limit;
        if substring {
            options = options.with_substring(filespec_column);
        }

        let mut criteria = vec![(filespec_column, Value::Text(wanted.to_lowercase()))];
        match (self.volume_column(), volume_id) {
            (Some(volume_column), Some(volume_id)) if !volume_id.is_empty() => {
                criteria.push((volume_column, Value::Text(volume_id.to_lowercase())));
            }
            _ => {}
        }

        log::debug!("Looking up {criteria:?}");
        self.find_row_indices(&criteria, &options)
    }

    /// First row whose volume id and file specification match.
    pub fn find_row_index_by_volume_filespec(
        &self,
        volume_id: Option<&str>,
        filespec: &str,
        substring: bool,
    ) -> Result<usize, PdsTableError> {
        self.find_row_indices_by_volume_filespec(volume_id, filespec, Some(1), substring)?
            .first()
            .copied()
            .ok_or_else(|| match volume_id {
                Some(volume_id) if !volume_id.is_empty() => {
                    PdsTableError::RowNotFound(format!("volume_id={volume_id}; filespec={filespec}"))
                }
                _ => PdsTableError::RowNotFound(format!("filespec={filespec}")),
            })
    }
}

#[cfg(test)]
mod filename_index_test {
    use super::*;
    use crate::{
        assemble::TableAssembler,
        schema::{
            column::{ColumnSchema, DataType},
            TableSchema,
        },
    };

    fn index_table(records: &[&[u8]], filespec_bytes: usize) -> Table {
        let schema = TableSchema::new(
            filespec_bytes + 17,
            records.len(),
            vec![
                ColumnSchema::new("VOLUME_ID", DataType::Text, 2, 10),
                ColumnSchema::new("FILE SPECIFICATION NAME", DataType::Text, 15, filespec_bytes),
            ],
        )
        .unwrap();
        TableAssembler::default().assemble(records, schema).unwrap()
    }

    #[test]
    fn test_filename_key() {
        assert_eq!(filename_key("data/C1234567_GEOM.LBL", None), "C1234567_GEOM");
        assert_eq!(filename_key("data/C1234567_GEOM.LBL", Some(8)), "C1234567");
        assert_eq!(filename_key("N1454725799_1.IMG", Some(0)), "N1454725799_1");
        assert_eq!(filename_key("archive.tar.gz", None), "archive.tar");
        assert_eq!(split_extension("a.b/c"), ("a.b/c", ""));
        assert_eq!(split_extension("dir/.hidden"), ("dir/.hidden", ""));
    }

    #[test]
    fn test_index_rows_by_filename_key() {
        let records: [&[u8]; 3] = [
            b"\"COISS_2001\",\"data/N001.IMG\"\r\n",
            b"\"COISS_2001\",\"data/N002.IMG\"\r\n",
            b"\"COISS_2002\",\"data/n001.LBL\"\r\n",
        ];
        let table = index_table(&records, 13);
        assert_eq!(table.filespec_column(), Some("FILE SPECIFICATION NAME"));
        assert_eq!(table.volume_column(), Some("VOLUME_ID"));

        let index = table.index_rows_by_filename_key(None).unwrap();
        assert_eq!(index.keys(), ["N001", "N002"]);
        assert_eq!(index.row_indices("n001"), [0, 2]);
        assert!(index.row_indices("N999").is_empty());
    }

    #[test]
    fn test_find_by_volume_filespec() {
        let records: [&[u8]; 3] = [
            b"\"COISS_2001\",\"data/N001.IMG\"\r\n",
            b"\"COISS_2001\",\"data/N002.IMG\"\r\n",
            b"\"COISS_2002\",\"data/N001.IMG\"\r\n",
        ];
        let table = index_table(&records, 13);

        assert_eq!(
            table
                .find_row_indices_by_volume_filespec(None, "DATA/n001.lbl", None, false)
                .unwrap(),
            [0, 2]
        );
        assert_eq!(
            table
                .find_row_index_by_volume_filespec(Some("coiss_2002"), "data/N001.LBL", false)
                .unwrap(),
            2
        );
        assert_eq!(
            table
                .find_row_indices_by_volume_filespec(Some(""), "N00", None, true)
                .unwrap(),
            [0, 1, 2]
        );
        assert_eq!(
            table
                .find_row_indices_by_volume_filespec(None, "data/N00", Some(2), true)
                .unwrap(),
            [0, 1]
        );
        assert_eq!(
            table.find_row_index_by_volume_filespec(Some("COISS_2003"), "data/N001.IMG", false),
            Err(PdsTableError::RowNotFound(
                "volume_id=COISS_2003; filespec=data/N001.IMG".into()
            ))
        );
    }

    #[test]
    fn test_vms_and_basename_examples() {
        let records: [&[u8]; 1] = [b"\"VG_0001   \",\"[IMAGES.C34]C3450201.IMQ\"\r\n"];
        let table = index_table(&records, 24);
        assert_eq!(
            table
                .find_row_indices_by_volume_filespec(None, "images/c34/c3450201.lbl", None, false)
                .unwrap(),
            [0]
        );

        let records: [&[u8]; 1] = [b"\"VG_0001   \",\"C3450201.IMQ\"\r\n"];
        let table = index_table(&records, 12);
        assert_eq!(
            table
                .find_row_indices_by_volume_filespec(Some("vg_0001"), "images/c34/C3450201", None, false)
                .unwrap(),
            [0]
        );
    }
}
