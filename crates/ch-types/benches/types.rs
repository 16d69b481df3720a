//! Benchmarks for type descriptor parsing and value encoding.

#![allow(clippy::unwrap_used, missing_docs)]

use ch_codec::OutputStream;
use ch_types::{DataType, Value};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

/// Benchmark descriptor parsing from flat to deeply nested.
fn bench_parse(c: &mut Criterion) {
    let descriptors = [
        ("parse_scalar", "UInt64"),
        ("parse_nullable", "Nullable(String)"),
        (
            "parse_nested",
            "Array(Nullable(Map(String, Tuple(UInt8, Float32, Array(DateTime)))))",
        ),
    ];

    for (name, descriptor) in descriptors {
        c.bench_function(name, |b| {
            b.iter(|| black_box(DataType::parse(black_box(descriptor)).unwrap()))
        });
    }
}

/// Benchmark value encoding.
fn bench_encode(c: &mut Criterion) {
    let ty = DataType::parse("Array(Int64)").unwrap();
    let value = Value::from((0..1024).map(|i| i64::from(i) - 512).collect::<Vec<_>>());

    c.bench_function("encode_int64_array_1024", |b| {
        b.iter(|| {
            let mut out = OutputStream::new();
            ty.write_value(&mut out, black_box(&value)).unwrap();
            black_box(out)
        })
    });

    let ty = DataType::parse("Tuple(String, Nullable(Float64), Date)").unwrap();
    let value = Value::Tuple(vec![
        Value::from("clickhouse"),
        Value::Float64(1.5),
        Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
    ]);
    c.bench_function("encode_tuple", |b| {
        b.iter(|| {
            let mut out = OutputStream::new();
            ty.write_value(&mut out, black_box(&value)).unwrap();
            black_box(out)
        })
    });
}

criterion_group!(benches, bench_parse, bench_encode);
criterion_main!(benches);
