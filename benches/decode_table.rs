use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use pdstable::{
    records::FixedLengthRecords,
    schema::column::{ColumnSchema, DataType},
    AssemblyMode, AssemblyOptions, RecordDecoder, TableAssembler, TableSchema,
};

const RECORD_LENGTH: usize = 63;

/// Index-like schema: a quoted name, a time, a scalar real with a sentinel and a
/// three-item integer array.
fn schema(record_count: usize) -> TableSchema {
    TableSchema::new(
        RECORD_LENGTH,
        record_count,
        vec![
            ColumnSchema::new("FILE_NAME", DataType::Text, 2, 16),
            ColumnSchema::new("START_TIME", DataType::Time, 20, 21),
            ColumnSchema::new("EXPOSURE", DataType::Real, 42, 10).with_invalid_constant(-1i64),
            ColumnSchema::new("COUNTS", DataType::Integer, 53, 9)
                .with_items(3, 3, 3)
                .with_valid_range(0.0, 500.0),
        ],
    )
    .expect("bench schema")
}

fn make_records(n: usize) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(n * RECORD_LENGTH);
    for i in 0..n {
        let exposure = if i % 17 == 0 { -1.0 } else { i as f64 * 0.125 };
        let line = format!(
            "\"N{:015}\",2004-{:03}T12:30:45.250,{:>10.3},{:>3}{:>3}{:>3}\r\n",
            i,
            1 + i % 365,
            exposure,
            i % 600,
            (i * 7) % 600,
            (i * 13) % 600
        );
        assert_eq!(line.len(), RECORD_LENGTH);
        buffer.extend_from_slice(line.as_bytes());
    }
    buffer
}

fn bench_decode_record(c: &mut Criterion) {
    let data = make_records(1);
    let decoder = RecordDecoder::for_schema(Arc::new(schema(1)));

    c.bench_function("decode_record/single", |b| {
        b.iter(|| decoder.decode(black_box(&data)).expect("decode"))
    });
}

fn bench_assemble(c: &mut Criterion) {
    let rows = 50_000usize;
    let data = make_records(rows);
    let schema = Arc::new(schema(rows));

    for (label, mode) in [
        ("assemble/strict_50k", AssemblyMode::Strict),
        ("assemble/lenient_50k", AssemblyMode::Lenient),
    ] {
        let assembler = TableAssembler::new(AssemblyOptions::new().with_mode(mode));
        c.bench_function(label, |b| {
            b.iter_batched(
                || Arc::clone(&schema),
                |schema| {
                    let records = FixedLengthRecords::for_schema(&data, &schema);
                    let table = assembler.assemble(records, schema).expect("assemble");
                    black_box(table.row_count())
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_decode_record, bench_assemble);
criterion_main!(benches);
