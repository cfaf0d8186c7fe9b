//! Protocol encoding/decoding and batch reassembly benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gremlin_client::Exchange;
use gremlin_protocol::{Decoder, Encoder, Request, Response, StatusCode};
use serde_json::json;
use uuid::Uuid;

fn create_test_request(payload_size: usize) -> Request {
    Request::query("g.V().has('person', 'name', name).out('knows').values('name')")
        .with_binding("name", "x".repeat(payload_size))
        .with_batch_size(64)
}

fn create_test_response(id: Uuid, code: StatusCode, items: usize) -> Response {
    let data: Vec<_> = (0..items)
        .map(|i| json!({"id": i, "label": "person", "properties": {"name": [{"value": "marko"}]}}))
        .collect();
    Response::new(id, code).with_data(serde_json::value::to_raw_value(&data).unwrap())
}

fn bench_request_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_encode");

    for size in [100, 1000, 10000] {
        let request = create_test_request(size);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| black_box(Encoder::encode_request(request).unwrap()));
        });
    }

    group.finish();
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");

    for size in [100, 1000, 10000] {
        let encoded = Encoder::encode_request(&create_test_request(size)).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| black_box(Decoder::decode_request(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_response_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response_decode");

    for items in [1, 64, 1024] {
        let response = create_test_response(Uuid::new_v4(), StatusCode::Success, items);
        let encoded = Encoder::encode_response(&response).unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &encoded, |b, encoded| {
            b.iter(|| black_box(Decoder::decode_response(encoded).unwrap()));
        });
    }

    group.finish();
}

fn bench_batch_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_reassembly");
    let id = Uuid::new_v4();

    for batches in [1, 8, 64] {
        let mut frames: Vec<Response> = (0..batches - 1)
            .map(|_| create_test_response(id, StatusCode::PartialContent, 64))
            .collect();
        frames.push(create_test_response(id, StatusCode::Success, 64));

        group.throughput(Throughput::Elements((batches * 64) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batches), &frames, |b, frames| {
            b.iter(|| {
                let mut exchange = Exchange::new();
                let mut last = None;
                for frame in frames {
                    last = Some(exchange.on_response(frame.clone()).unwrap());
                }
                black_box(last)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_request_encode,
    bench_request_decode,
    bench_response_decode,
    bench_batch_reassembly,
);

criterion_main!(benches);
