use crate::decode::DecodeError;
use crate::types::AggregatePart;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error as ThisError;

/// Boxed driver error kept as the `source` of store failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

///
/// BenchError
///
/// Everything a single strategy invocation can fail with. Errors are local to
/// the invocation and are never retried or partially suppressed.
///
#[derive(Debug, ThisError)]
pub enum BenchError {
    /// The store could not be reached or refused the session.
    #[error("cannot connect to '{target}': {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    /// Malformed statement or driver-level failure during a request.
    #[error("query failed ({context}): {source}")]
    Query {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("order {order_id} does not exist")]
    MissingOrder { order_id: i64 },

    #[error("order {order_id} matched {rows} order rows, expected exactly one")]
    DuplicateOrder { order_id: i64, rows: usize },

    #[error("order {order_id} has {rows} shipping rows, expected at most one")]
    AmbiguousShipping { order_id: i64, rows: usize },

    /// Flat join rows that are not an item × shipping × payment fan-out.
    #[error("{rows} join rows for order {order_id} do not form an item x payment fan-out")]
    UnshapedJoin { order_id: i64, rows: usize },

    /// A multi-statement response was read past its last result set.
    #[error("result set {index} requested but the response carried only {available}")]
    ResultSetExhausted { index: usize, available: usize },

    #[error(transparent)]
    ParallelBranch(BranchFailures),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BenchError {
    pub fn connection(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        BenchError::Connection {
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn query(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        BenchError::Query {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// One failed branch of the parallel strategy.
#[derive(Debug)]
pub struct BranchFailure {
    pub part: AggregatePart,
    pub error: BenchError,
}

/// Every failed branch of one parallel invocation, in the order the failures
/// were observed. Never empty.
#[derive(Debug)]
pub struct BranchFailures(Vec<BranchFailure>);

impl BranchFailures {
    /// `None` when nothing failed.
    pub fn from_failures(failures: Vec<BranchFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self(failures))
        }
    }

    pub fn first(&self) -> &BranchFailure {
        &self.0[0]
    }

    pub fn all(&self) -> &[BranchFailure] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parts(&self) -> impl Iterator<Item = AggregatePart> + '_ {
        self.0.iter().map(|f| f.part)
    }
}

impl fmt::Display for BranchFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first();
        write!(
            f,
            "{} of {} parallel branches failed; first {}: {}",
            self.0.len(),
            AggregatePart::ALL.len(),
            first.part,
            first.error
        )
    }
}

impl StdError for BranchFailures {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.first().error)
    }
}
