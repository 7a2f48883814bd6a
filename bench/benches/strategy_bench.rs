//! Criterion benchmark harness: measures one order aggregate read per strategy
//! against a seeded shared in-memory SQLite store.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use query_trip_bench::populate::{ensure_seeded, SeedParams};
use query_trip_bench::store::sqlite::SqliteStore;
use query_trip_bench::store::Store;
use query_trip_bench::strategy::{BenchCase, Strategy};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Data shapes to benchmark.
fn seed_levels() -> Vec<(&'static str, SeedParams)> {
    vec![
        ("std", SeedParams::standard()), // 2 items x 3 payments
        ("wide", SeedParams::wide()),    // 10 items x 5 payments
    ]
}

/// Open a fresh named in-memory database and seed it.
fn setup_store(rt: &Runtime, name: &str, params: &SeedParams) -> Arc<SqliteStore> {
    let store = SqliteStore::shared_memory(name).expect("Failed to open shared in-memory SQLite");
    rt.block_on(async {
        let mut session = store.connect().await.expect("Failed to connect");
        ensure_seeded(&mut session, params)
            .await
            .expect("Failed to seed");
    });
    Arc::new(store)
}

fn bench_strategies(c: &mut Criterion) {
    let rt = Runtime::new().expect("Failed to build tokio runtime");

    for (label, params) in seed_levels() {
        let store = setup_store(&rt, &format!("criterion_{label}"), &params);
        let mut group = c.benchmark_group(format!("order_aggregate/{label}"));
        group.measurement_time(Duration::from_secs(10));
        group.sample_size(50);

        for strategy in Strategy::ALL {
            let case = BenchCase::new(strategy, Arc::clone(&store), 1);
            group.bench_with_input(
                BenchmarkId::from_parameter(strategy.name()),
                &case,
                |b, case| {
                    b.to_async(&rt)
                        .iter(|| async { case.run().await.expect("strategy failed") });
                },
            );
        }
        group.finish();
    }
}

criterion_group!(benches, bench_strategies);
criterion_main!(benches);
