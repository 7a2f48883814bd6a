//! Report module: per-strategy latency and allocation figures, printed as
//! human-readable blocks plus a comparison table.

use crate::strategy::Strategy;
use order_core::types::Aggregate;
use std::time::Duration;

/// One successful timed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub elapsed: Duration,
    pub allocations: u64,
    pub allocated_bytes: u64,
    pub rows: usize,
}

/// Results from a benchmark run of one strategy.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub strategy: Strategy,
    pub order_id: i64,
    pub samples: Vec<Sample>,
    /// Failed trials, warm-up included.
    pub failures: usize,
    /// Whether allocation counts were collected.
    pub counts_allocations: bool,
}

impl StrategyResult {
    pub fn new(strategy: Strategy, order_id: i64) -> Self {
        Self {
            strategy,
            order_id,
            samples: Vec::new(),
            failures: 0,
            counts_allocations: false,
        }
    }

    pub fn add_sample(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn add_failure(&mut self) {
        self.failures += 1;
    }

    pub fn mean_us(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().map(|s| micros(s.elapsed)).sum();
        sum / self.samples.len() as f64
    }

    pub fn percentile_us(&self, pct: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().map(|s| micros(s.elapsed)).collect();
        sorted.sort_by(f64::total_cmp);
        let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn mean_allocations(&self) -> f64 {
        self.mean_of(|s| s.allocations as f64)
    }

    pub fn mean_allocated_bytes(&self) -> f64 {
        self.mean_of(|s| s.allocated_bytes as f64)
    }

    /// Rows returned per invocation; constant for a given order.
    pub fn rows(&self) -> Option<usize> {
        self.samples.first().map(|s| s.rows)
    }

    fn mean_of(&self, f: impl Fn(&Sample) -> f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(f).sum::<f64>() / self.samples.len() as f64
    }
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}

fn alloc_column(result: &StrategyResult, value: f64) -> String {
    if result.counts_allocations && !result.samples.is_empty() {
        format!("{value:.0}")
    } else {
        "-".to_string()
    }
}

/// Print what the benchmarked order looks like: the fan-out every strategy pays for.
pub fn print_order_summary(aggregate: &Aggregate) {
    let order = aggregate.order();
    println!(
        "  Order {} for {} on {}",
        order.order_id, order.customer_name, order.order_date
    );
    println!(
        "    {} items totalling {}, {} payments totalling {}",
        aggregate.items().len(),
        aggregate.item_total(),
        aggregate.payments().len(),
        aggregate.paid_total()
    );
    match aggregate.shipping() {
        Some(ship) => println!("    Ships to {}, {}", ship.city, ship.country),
        None => println!("    Not shipped"),
    }
}

/// Print a formatted report comparing strategy results.
pub fn print_report(target: &str, results: &[StrategyResult]) {
    println!("\n{}", "=".repeat(80));
    println!("  Order Aggregate Round-Trip Benchmark");
    println!("  Store: {target}");
    println!("{}", "=".repeat(80));

    for result in results {
        println!(
            "\n  Strategy: {} | Order: {}",
            result.strategy, result.order_id
        );
        println!("  {}", result.strategy.description());
        println!("  {}", "-".repeat(60));

        if result.samples.is_empty() {
            println!("  No successful samples ({} failed)", result.failures);
            continue;
        }

        let mean = result.mean_us();
        println!("  Mean:            {:>10.1}µs  ({:.3}ms)", mean, mean / 1000.0);
        println!("  p50:             {:>10.1}µs", result.percentile_us(50.0));
        println!("  p95:             {:>10.1}µs", result.percentile_us(95.0));
        println!("  p99:             {:>10.1}µs", result.percentile_us(99.0));
        println!(
            "  Allocations:     {:>10}",
            alloc_column(result, result.mean_allocations())
        );
        println!(
            "  Allocated bytes: {:>10}",
            alloc_column(result, result.mean_allocated_bytes())
        );
        println!("  Rows returned:   {:>10}", result.rows().unwrap_or(0));
        println!(
            "  Samples:         {:>10}  ({} failed)",
            result.samples.len(),
            result.failures
        );
    }

    println!("\n{}", "=".repeat(80));

    if results.len() >= 2 {
        println!("\n  Comparison Summary:");
        println!(
            "  {:12} {:>12} {:>12} {:>10} {:>12} {:>6} {:>7}",
            "Strategy", "Mean (µs)", "p95 (µs)", "Allocs", "Bytes", "Rows", "Failed"
        );
        println!("  {}", "-".repeat(77));
        for r in results {
            println!(
                "  {:12} {:>12.1} {:>12.1} {:>10} {:>12} {:>6} {:>7}",
                r.strategy.name(),
                r.mean_us(),
                r.percentile_us(95.0),
                alloc_column(r, r.mean_allocations()),
                alloc_column(r, r.mean_allocated_bytes()),
                r.rows().unwrap_or(0),
                r.failures
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(us: u64, allocations: u64) -> Sample {
        Sample {
            elapsed: Duration::from_micros(us),
            allocations,
            allocated_bytes: allocations * 64,
            rows: 6,
        }
    }

    #[test]
    fn empty_result_reports_zeroes() {
        let result = StrategyResult::new(Strategy::Join, 1);
        assert_eq!(result.mean_us(), 0.0);
        assert_eq!(result.percentile_us(95.0), 0.0);
        assert_eq!(result.rows(), None);
    }

    #[test]
    fn mean_and_percentiles() {
        let mut result = StrategyResult::new(Strategy::Sequential, 1);
        for us in [40, 10, 30, 20, 50] {
            result.add_sample(sample(us, us / 10));
        }
        assert!((result.mean_us() - 30.0).abs() < 1e-6);
        assert!((result.percentile_us(50.0) - 30.0).abs() < 1e-6);
        assert!((result.percentile_us(99.0) - 50.0).abs() < 1e-6);
        assert!((result.percentile_us(0.0) - 10.0).abs() < 1e-6);
        assert!((result.mean_allocations() - 3.0).abs() < 1e-6);
        assert!((result.mean_allocated_bytes() - 192.0).abs() < 1e-6);
        assert_eq!(result.rows(), Some(6));
    }

    #[test]
    fn allocations_show_dash_when_not_counted() {
        let mut result = StrategyResult::new(Strategy::Parallel, 1);
        result.add_sample(sample(10, 5));
        assert_eq!(alloc_column(&result, result.mean_allocations()), "-");
        result.counts_allocations = true;
        assert_eq!(alloc_column(&result, result.mean_allocations()), "5");
    }
}
