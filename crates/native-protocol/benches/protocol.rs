//! Benchmarks for native protocol encoding and decoding.

#![allow(clippy::unwrap_used, missing_docs)]

use bytes::BytesMut;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use native_protocol::{
    ExceptionPacket, QueryPacket, Revision, ServerHello,
    codec::{decode_varint, get_string, put_string, put_varint},
    encode_empty_block,
};

/// Benchmark varint encoding across byte widths.
fn bench_varint(c: &mut Criterion) {
    let values = [0u64, 127, 16_384, 268_435_456, u64::MAX];

    c.bench_function("varint_encode", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(64);
            for &v in &values {
                put_varint(&mut buf, black_box(v));
            }
            black_box(buf)
        })
    });

    let mut buf = BytesMut::new();
    put_varint(&mut buf, u64::MAX);
    let encoded = buf.freeze();
    c.bench_function("varint_decode_max", |b| {
        b.iter(|| black_box(decode_varint(black_box(&encoded)).unwrap()))
    });
}

/// Benchmark string decoding.
fn bench_string(c: &mut Criterion) {
    let mut buf = BytesMut::new();
    put_string(&mut buf, &"clickhouse ".repeat(32));
    let encoded = buf.freeze();

    c.bench_function("string_decode", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            black_box(get_string(&mut cursor).unwrap())
        })
    });
}

/// Benchmark query packet encoding.
fn bench_query_encode(c: &mut Criterion) {
    let packet = QueryPacket::new("SELECT number FROM system.numbers LIMIT 10", "default", Revision::new(54460))
        .with_settings([("max_threads", "4"), ("max_block_size", "65536")]);

    c.bench_function("query_encode", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(256);
            packet.encode(&mut buf);
            encode_empty_block(&mut buf);
            black_box(buf)
        })
    });
}

/// Benchmark server packet decoding.
fn bench_server_decode(c: &mut Criterion) {
    let hello = ServerHello {
        name: "ClickHouse".into(),
        version_major: 23,
        version_minor: 8,
        revision: Revision::new(54460),
        timezone: "UTC".into(),
        display_name: "bench".into(),
        version_patch: 1,
    };
    let mut buf = BytesMut::new();
    hello.encode(&mut buf);
    let hello_bytes = buf.split().freeze();

    ExceptionPacket {
        code: 62,
        name: "DB::Exception".into(),
        message: "Syntax error".into(),
        stack_trace: "0. frame\n1. frame\n".into(),
        nested: None,
    }
    .encode(&mut buf);
    let exception_bytes = buf.freeze();

    c.bench_function("server_hello_decode", |b| {
        b.iter(|| {
            let mut cursor = &hello_bytes[1..];
            black_box(ServerHello::decode(&mut cursor).unwrap())
        })
    });

    c.bench_function("exception_decode", |b| {
        b.iter(|| {
            let mut cursor = &exception_bytes[1..];
            black_box(ExceptionPacket::decode(&mut cursor).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_varint,
    bench_string,
    bench_query_encode,
    bench_server_decode,
);

criterion_main!(benches);
