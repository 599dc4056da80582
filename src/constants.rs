//! # Constants and type definitions for pdstable
//!
//! This module centralizes the label keywords, well-known column names and the common
//! container aliases shared by the schema, decoding and table modules.
//!
//! ## Overview
//!
//! - Label keywords recognized on column objects
//! - Keywords that declare a "no data" sentinel value
//! - Column names used to locate file specifications and volume identifiers in index tables
//! - Hash map and inline-vector aliases used across the crate

use std::collections::{HashMap, HashSet};

use ahash::RandomState;
use smallvec::SmallVec;

use crate::decode::value::DecodedValue;

// -------------------------------------------------------------------------------------------------
// Label keywords
// -------------------------------------------------------------------------------------------------

pub const NAME: &str = "NAME";
pub const DATA_TYPE: &str = "DATA_TYPE";
pub const START_BYTE: &str = "START_BYTE";
pub const BYTES: &str = "BYTES";
pub const ITEMS: &str = "ITEMS";
pub const ITEM_BYTES: &str = "ITEM_BYTES";
pub const ITEM_OFFSET: &str = "ITEM_OFFSET";
pub const FORMAT: &str = "FORMAT";
pub const UNITS: &str = "UNITS";
pub const DESCRIPTION: &str = "DESCRIPTION";
pub const VALID_RANGE: &str = "VALID_RANGE";
pub const VALID_MINIMUM: &str = "VALID_MINIMUM";
pub const VALID_MAXIMUM: &str = "VALID_MAXIMUM";

pub const OBJECT: &str = "OBJECT";
pub const COLUMN_OBJECT: &str = "COLUMN";

pub const RECORD_BYTES: &str = "RECORD_BYTES";
pub const ROW_BYTES: &str = "ROW_BYTES";
pub const FILE_RECORDS: &str = "FILE_RECORDS";
pub const ROWS: &str = "ROWS";

/// Keywords declaring a sentinel value. `INVALID_CONSTANT` comes first and is the
/// primary sentinel of a column.
pub const SENTINEL_KEYS: [&str; 10] = [
    "INVALID_CONSTANT",
    "MISSING_CONSTANT",
    "UNKNOWN_CONSTANT",
    "NOT_APPLICABLE_CONSTANT",
    "NULL_CONSTANT",
    "INVALID",
    "MISSING",
    "UNKNOWN",
    "NOT_APPLICABLE",
    "NULL",
];

// -------------------------------------------------------------------------------------------------
// Index table column names
// -------------------------------------------------------------------------------------------------

/// Candidate names of the column holding file specifications, in lookup order.
pub const FILE_SPECIFICATION_COLUMN_NAMES: [&str; 8] = [
    "FILE_SPECIFICATION_NAME",
    "FILE SPECIFICATION NAME",
    "FILE_NAME",
    "FILE NAME",
    "FILENAME",
    "PRODUCT_ID",
    "PRODUCT ID",
    "STSCI_GROUP_ID",
];

/// Candidate names of the column holding volume identifiers, in lookup order.
pub const VOLUME_ID_COLUMN_NAMES: [&str; 4] = ["VOLUME_ID", "VOLUME ID", "VOLUME_NAME", "VOLUME NAME"];

// -------------------------------------------------------------------------------------------------
// Tuning
// -------------------------------------------------------------------------------------------------

/// Number of records decoded per batch during table assembly.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
pub type FastHashSet<K> = HashSet<K, RandomState>;

/// The decoded items of one column in one record.
///
/// Every column decodes to a fixed-size sequence: scalar columns are the size-1 case and
/// stay inline, array columns spill to the heap.
pub type Field = SmallVec<[DecodedValue; 1]>;
