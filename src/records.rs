//! # Record splitting
//!
//! The decoder works on raw record spans and never performs I/O. This module cuts an
//! in-memory data file into those spans.
//!
//! * [`FixedLengthRecords`] – consecutive `record_length`-byte chunks. A trailing partial
//!   chunk is yielded as-is so its length error surfaces during assembly instead of
//!   being dropped.
//! * [`lines`] – newline-terminated records, terminator included, for data files whose
//!   records are read line by line.
use std::slice::Chunks;

use crate::{
    pdstable_errors::{PdsTableError, SchemaError},
    schema::TableSchema,
};

/// Iterator over the fixed-length records of a buffer.
#[derive(Debug, Clone)]
pub struct FixedLengthRecords<'a> {
    chunks: Chunks<'a, u8>,
}

impl<'a> FixedLengthRecords<'a> {
    /// Split `buffer` into records of `record_length` bytes.
    ///
    /// Return
    /// ----------
    /// * [`SchemaError::ZeroRecordLength`] when `record_length` is zero.
    pub fn new(buffer: &'a [u8], record_length: usize) -> Result<Self, PdsTableError> {
        if record_length == 0 {
            return Err(SchemaError::ZeroRecordLength.into());
        }
        Ok(FixedLengthRecords {
            chunks: buffer.chunks(record_length),
        })
    }

    /// Split `buffer` with the record length of a schema.
    pub fn for_schema(buffer: &'a [u8], schema: &TableSchema) -> Self {
        FixedLengthRecords {
            chunks: buffer.chunks(schema.record_length()),
        }
    }
}

impl<'a> Iterator for FixedLengthRecords<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for FixedLengthRecords<'_> {}

/// Split a buffer into `\n`-terminated records, keeping the terminator.
///
/// A final record without terminator is yielded as well.
pub fn lines(buffer: &[u8]) -> impl Iterator<Item = &[u8]> {
    buffer.split_inclusive(|&b| b == b'\n')
}

#[cfg(test)]
mod records_test {
    use super::*;

    #[test]
    fn test_fixed_length_records() {
        let records = FixedLengthRecords::new(b"abcdefgh", 3).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records.collect::<Vec<_>>(),
            [&b"abc"[..], &b"def"[..], &b"gh"[..]]
        );
        assert!(FixedLengthRecords::new(b"", 3).unwrap().next().is_none());
        assert_eq!(
            FixedLengthRecords::new(b"abc", 0).unwrap_err(),
            PdsTableError::Schema(SchemaError::ZeroRecordLength)
        );
    }

    #[test]
    fn test_lines_keep_terminator() {
        let records = lines(b"ab\r\ncd\r\nef").collect::<Vec<_>>();
        assert_eq!(records, [&b"ab\r\n"[..], &b"cd\r\n"[..], &b"ef"[..]]);
    }
}
