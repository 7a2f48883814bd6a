//! The four ways of reading one order aggregate, and the uniform boundary the
//! bench driver calls them through.
//!
//! | Strategy         | Connections | Round-trips | Result sets | Output       |
//! |------------------|-------------|-------------|-------------|--------------|
//! | Sequential       | 1           | 4           | 4           | Aggregate    |
//! | Parallel         | 4           | 4           | 4           | Aggregate    |
//! | Multi-result-set | 1           | 1           | 4           | Aggregate    |
//! | Join             | 1           | 1           | 1           | Flat rows    |

pub mod join;
pub mod multi;
pub mod parallel;
pub mod sequential;

use crate::store::Store;
use order_core::types::ExecutorResult;
use order_core::BenchError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Sequential,
    Parallel,
    MultiResultSet,
    Join,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Sequential,
        Strategy::Parallel,
        Strategy::MultiResultSet,
        Strategy::Join,
    ];

    /// Stable short name, used in config and reports.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::Parallel => "parallel",
            Strategy::MultiResultSet => "multi",
            Strategy::Join => "join",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Strategy::Sequential => "Multiple async calls, sequential (4 trips)",
            Strategy::Parallel => "Multiple async calls, parallel (4 trips, 4 connections)",
            Strategy::MultiResultSet => "Multiple result sets (1 trip)",
            Strategy::Join => "JOIN (1 trip, server-shaped)",
        }
    }

    /// Run this strategy once for `order_id`.
    pub async fn execute<S: Store>(
        self,
        store: &Arc<S>,
        order_id: i64,
    ) -> Result<ExecutorResult, BenchError> {
        match self {
            Strategy::Sequential => sequential::execute(store.as_ref(), order_id)
                .await
                .map(ExecutorResult::Aggregate),
            Strategy::Parallel => parallel::execute(store, order_id)
                .await
                .map(ExecutorResult::Aggregate),
            Strategy::MultiResultSet => multi::execute(store.as_ref(), order_id)
                .await
                .map(ExecutorResult::Aggregate),
            Strategy::Join => join::execute(store.as_ref(), order_id)
                .await
                .map(ExecutorResult::FlatRows),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(wanted))
            .or_else(|| match wanted.to_ascii_lowercase().as_str() {
                "multi-result-set" | "multiresultset" | "query-multiple" => {
                    Some(Strategy::MultiResultSet)
                }
                _ => None,
            })
            .ok_or_else(|| BenchError::Config(format!("unknown strategy '{wanted}'")))
    }
}

/// One strategy bound to a store and an order id: the zero-argument unit of
/// work the bench driver times. Invocations share no state.
pub struct BenchCase<S> {
    strategy: Strategy,
    store: Arc<S>,
    order_id: i64,
}

impl<S: Store> BenchCase<S> {
    pub fn new(strategy: Strategy, store: Arc<S>, order_id: i64) -> Self {
        Self {
            strategy,
            store,
            order_id,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn order_id(&self) -> i64 {
        self.order_id
    }

    pub async fn run(&self) -> Result<ExecutorResult, BenchError> {
        self.strategy.execute(&self.store, self.order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_parse_from_their_names() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!(
            " Query-Multiple ".parse::<Strategy>().unwrap(),
            Strategy::MultiResultSet
        );
    }

    #[test]
    fn unknown_strategy_is_a_config_error() {
        let err = "nested-loop".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }
}
