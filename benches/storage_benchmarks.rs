use criterion::{criterion_group, criterion_main, Criterion};
use qr_app_storage::prelude::*;
use qr_app_storage::storage::StorageFactory;
use serde_json::json;
use std::hint::black_box;

fn bench_local_round_trip(c: &mut Criterion) {
    let store = StorageFactory::create_memory_local();
    let data_url = format!("data:image/png;base64,{}", "A".repeat(4096));
    let value = json!({
        "id": "img-1",
        "width": 256,
        "height": 256,
        "data_url": data_url,
    });

    c.bench_function("local_set", |b| {
        b.iter(|| store.set(black_box("img-1"), black_box(&value)).unwrap())
    });

    store.set("img-1", &value).unwrap();
    c.bench_function("local_get", |b| {
        b.iter(|| store.get::<serde_json::Value>(black_box("img-1")).unwrap())
    });
}

fn bench_idb_round_trip(c: &mut Criterion) {
    let store = StorageFactory::create_memory_idb();
    let value = json!({ "n": 1, "tags": ["a", "b", "c"] });

    c.bench_function("idb_set_get", |b| {
        b.iter(|| {
            tokio_test::block_on(async {
                store.set(black_box("a"), black_box(&value)).await.unwrap();
                store.get::<serde_json::Value>(black_box("a")).await.unwrap()
            })
        })
    });
}

criterion_group!(benches, bench_local_round_trip, bench_idb_round_trip);
criterion_main!(benches);
