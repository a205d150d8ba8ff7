use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::{Method, Request, Response};
use std::sync::Arc;

use response_replay::replay::{
    InMemoryTaggedCache, ReplayRecord, ReplayStore, RequestFingerprint, RequestHasher,
    Sha256RequestHasher,
};

fn sample_response(body_len: usize) -> Response<String> {
    Response::builder()
        .status(201)
        .header("content-type", "application/json")
        .header("x-request-id", "bench")
        .header("vary", "accept")
        .header("vary", "authorization")
        .body("x".repeat(body_len))
        .unwrap()
}

fn benchmark_request_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("hashing");
    let hasher = Sha256RequestHasher::default();

    for size in [128, 4096, 65536].iter() {
        let (parts, ()) = Request::builder()
            .method(Method::POST)
            .uri("/orders?source=bench")
            .header("authorization", "Bearer token")
            .body(())
            .unwrap()
            .into_parts();
        let body = vec![b'a'; *size];

        group.bench_with_input(BenchmarkId::new("sha256", size), size, |b, _| {
            b.iter(|| {
                let fingerprint = RequestFingerprint::from_parts(&parts, &body);
                black_box(hasher.hash(black_box(&fingerprint)))
            });
        });
    }

    group.finish();
}

fn benchmark_record_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");
    let response = sample_response(1024);
    let record = ReplayRecord::from_response("key", "hash", &response).unwrap();
    let json = serde_json::to_string(&record).unwrap();

    group.bench_function("from_response", |b| {
        b.iter(|| black_box(ReplayRecord::from_response("key", "hash", black_box(&response)).unwrap()));
    });

    group.bench_function("to_response", |b| {
        b.iter(|| black_box(record.to_response(black_box("hash")).unwrap()));
    });

    group.bench_function("deserialize", |b| {
        b.iter(|| black_box(serde_json::from_str::<ReplayRecord>(black_box(&json)).unwrap()));
    });

    group.finish();
}

fn benchmark_store_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = ReplayStore::new(Arc::new(InMemoryTaggedCache::new()));
    let response = sample_response(1024);

    c.bench_function("store_save_then_replay", |b| {
        b.to_async(&runtime).iter(|| async {
            store.save("bench-key", "hash", &response).await.unwrap();
            black_box(store.replay("bench-key", "hash").await.unwrap())
        });
    });
}

criterion_group!(
    benches,
    benchmark_request_hashing,
    benchmark_record_conversion,
    benchmark_store_round_trip
);
criterion_main!(benches);
