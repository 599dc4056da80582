#![allow(dead_code)]

use approx::assert_relative_eq;
use camino::Utf8Path;
use pdstable::{
    constants::Field,
    label::{LabelObject, LabelValue},
};

pub const INDEX_DATA: &str = "tests/data/coiss_index.tab";

/// A `COLUMN` object with the four mandatory keys.
pub fn column(name: &str, data_type: &str, start_byte: i64, bytes: i64) -> LabelObject {
    LabelObject::new()
        .with("OBJECT", LabelValue::symbol("COLUMN"))
        .with("NAME", name)
        .with("DATA_TYPE", LabelValue::symbol(data_type))
        .with("START_BYTE", start_byte)
        .with("BYTES", bytes)
}

/// File-level object and `INDEX_TABLE` object describing `tests/data/coiss_index.tab`.
pub fn index_label() -> (LabelObject, LabelObject) {
    let file = LabelObject::new()
        .with("PDS_VERSION_ID", LabelValue::symbol("PDS3"))
        .with("RECORD_TYPE", LabelValue::symbol("FIXED_LENGTH"))
        .with("RECORD_BYTES", 84)
        .with("FILE_RECORDS", 4);

    let mut table = LabelObject::new()
        .with("OBJECT", LabelValue::symbol("INDEX_TABLE"))
        .with("INTERCHANGE_FORMAT", LabelValue::symbol("ASCII"))
        .with("ROWS", 4)
        .with("COLUMNS", 6)
        .with("ROW_BYTES", 84);

    table.push(
        "OBJECT",
        column("VOLUME_ID", "CHARACTER", 2, 10).with("FORMAT", "A10"),
    );
    table.push(
        "OBJECT",
        column("FILE_SPECIFICATION_NAME", "CHARACTER", 15, 20)
            .with("DESCRIPTION", "Path of the image label, relative to the volume root."),
    );
    table.push("OBJECT", column("START_TIME", "TIME", 37, 21));
    table.push(
        "OBJECT",
        column("EXPOSURE_DURATION", "ASCII_REAL", 59, 8)
            .with("UNITS", "SECOND")
            .with("FORMAT", "F8.4")
            .with(
                "INVALID_CONSTANT",
                LabelValue::real_literal("-1.0E32").expect("real literal"),
            ),
    );
    table.push(
        "OBJECT",
        column("GAIN", "ASCII_INTEGER", 68, 3).with("VALID_RANGE", vec![0i64, 100]),
    );
    table.push(
        "OBJECT",
        column("BIAS", "ASCII_REAL", 72, 11)
            .with("ITEMS", 2)
            .with("ITEM_BYTES", 5)
            .with("ITEM_OFFSET", 6),
    );

    (file, table)
}

pub fn read_index_data() -> Vec<u8> {
    std::fs::read(Utf8Path::new(INDEX_DATA)).expect("test index data")
}

pub fn assert_reals_close(field: &Field, expected: &[f64], epsilon: f64) {
    assert_eq!(field.len(), expected.len());
    for (item, expected) in field.iter().zip(expected) {
        assert_relative_eq!(
            item.value.as_f64().expect("numeric item"),
            *expected,
            epsilon = epsilon
        );
    }
}
