//! Runs one bench case through warm-up and timed samples.

use crate::alloc::{self, AllocSnapshot};
use crate::report::{Sample, StrategyResult};
use crate::store::Store;
use crate::strategy::BenchCase;
use log::{debug, warn};
use std::time::Instant;

/// Warm up `case`, then time `samples` invocations of it.
///
/// A failed invocation is a failed trial: it is logged and counted, and the
/// run continues.
pub async fn run_case<S: Store>(case: &BenchCase<S>, warmup: u32, samples: u32) -> StrategyResult {
    let strategy = case.strategy();
    let mut result = StrategyResult::new(strategy, case.order_id());

    for i in 0..warmup {
        if let Err(err) = case.run().await {
            warn!("{strategy}: warm-up {i} failed: {err}");
            result.add_failure();
        }
    }

    for i in 0..samples {
        let before = AllocSnapshot::now();
        let start = Instant::now();
        let outcome = case.run().await;
        let elapsed = start.elapsed();
        let allocated = before.delta(&AllocSnapshot::now());

        match outcome {
            Ok(output) => result.add_sample(Sample {
                elapsed,
                allocations: allocated.allocations,
                allocated_bytes: allocated.bytes,
                rows: output.row_count(),
            }),
            Err(err) => {
                warn!("{strategy}: sample {i} failed: {err}");
                result.add_failure();
            }
        }
    }

    result.counts_allocations = alloc::is_counting();
    debug!(
        "{strategy}: {} samples, {} failures, mean {:.1}µs",
        result.samples.len(),
        result.failures,
        result.mean_us()
    );
    result
}
