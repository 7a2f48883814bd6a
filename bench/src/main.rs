//! Standalone benchmark runner that prints the formatted report.
//!
//! Configuration comes from `ORDER_BENCH_*` environment variables, optionally
//! through a `.env` file (see [`query_trip_bench::config`]).
//!
//! Usage:
//!   cargo run --release -p query-trip-bench
//!   ORDER_BENCH_STRATEGIES=parallel,join cargo run --release -p query-trip-bench

use anyhow::Context;
use log::{error, info, warn};
use query_trip_bench::alloc::CountingAllocator;
use query_trip_bench::config::BenchConfig;
use query_trip_bench::driver::run_case;
use query_trip_bench::populate::{ensure_seeded, SeedParams};
use query_trip_bench::report::{print_order_summary, print_report};
use query_trip_bench::store::sqlite::SqliteStore;
use query_trip_bench::store::{Session, Store};
use query_trip_bench::strategy::{sequential, BenchCase};
use std::sync::Arc;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, warnings) = BenchConfig::from_env().context("invalid benchmark configuration")?;
    order_core::initialize_logger(config.log_level, config.log_file.as_deref())
        .context("failed to initialize logging")?;
    for warning in &warnings {
        warn!("{warning}");
    }

    info!(
        "Benchmark starting (db={}, order={}, level={}, logfile={})",
        config.database,
        config.order_id,
        config.log_level,
        config.log_file.as_deref().unwrap_or("none")
    );

    let store = Arc::new(SqliteStore::open(config.database.clone()));

    // Exploratory session: prove the store answers before measuring anything.
    let mut session = match store.connect().await {
        Ok(session) => session,
        Err(err) => {
            error!("{err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = session.ping().await {
        error!("{err}");
        std::process::exit(1);
    }

    if config.seed {
        ensure_seeded(&mut session, &SeedParams::standard())
            .await
            .context("failed to seed the database")?;
    }
    drop(session);

    println!("Running order aggregate round-trip benchmark...");
    println!("  Warmup invocations:  {}", config.warmup);
    println!("  Sample invocations:  {}", config.samples);
    match sequential::execute(store.as_ref(), config.order_id).await {
        Ok(aggregate) => print_order_summary(&aggregate),
        Err(err) => warn!("order {} cannot be read: {err}", config.order_id),
    }

    let mut results = Vec::with_capacity(config.strategies.len());
    for &strategy in &config.strategies {
        eprint!("  Benchmarking {strategy}...");
        let case = BenchCase::new(strategy, Arc::clone(&store), config.order_id);
        let result = run_case(&case, config.warmup, config.samples).await;
        eprintln!(
            " done ({:.3}ms mean, {} failed)",
            result.mean_us() / 1000.0,
            result.failures
        );
        results.push(result);
    }

    print_report(store.target(), &results);
    Ok(())
}
