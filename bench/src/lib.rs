//! Order Aggregate Query Round-Trip Benchmark
//!
//! Measures the cost of reading one order aggregate (order header, line
//! items, shipping details, payments) from four related tables under four
//! access strategies:
//! - **Sequential**: one connection, four queries one after another
//! - **Parallel**: four connections, four queries at once
//! - **Multi-result-set**: one connection, one request, four result sets
//! - **Join**: one connection, one wide LEFT JOIN, flat rows
//!
//! Run the report: `cargo run --release -p query-trip-bench`
//! Run benchmarks: `cargo bench`
//! Run tests: `cargo test`

pub mod alloc;
pub mod config;
pub mod driver;
pub mod populate;
pub mod report;
pub mod sql;
pub mod store;
pub mod strategy;
