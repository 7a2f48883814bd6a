//! Parallel strategy: four branches, each on its own connection, running
//! concurrently on the tokio runtime.
//!
//! Statements are never multiplexed over one connection; every concurrent
//! statement gets a session of its own. Assembly waits on a barrier: every
//! branch has settled, succeeded or failed, before anything is combined, so a
//! failure never yields a partial aggregate and no branch is left running
//! with a connection still open.
//!
//! All branch failures are kept, in the order they were observed, and
//! surfaced together as [`BenchError::ParallelBranch`]. Dropping the returned
//! future aborts every branch still in flight, which releases its session.

use crate::sql;
use crate::store::{Session, Store};
use order_core::assemble::AggregateParts;
use order_core::decode::decode_rows;
use order_core::types::{Aggregate, AggregatePart, Order, OrderItem, Payment, Shipping};
use order_core::value::Params;
use order_core::{BenchError, BranchFailure, BranchFailures};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Decoded rows of one branch.
enum BranchRows {
    Order(Vec<Order>),
    Items(Vec<OrderItem>),
    Shipping(Vec<Shipping>),
    Payments(Vec<Payment>),
}

impl BranchRows {
    fn store_into(self, parts: &mut AggregateParts) {
        match self {
            BranchRows::Order(rows) => parts.orders = rows,
            BranchRows::Items(rows) => parts.items = rows,
            BranchRows::Shipping(rows) => parts.shipping = rows,
            BranchRows::Payments(rows) => parts.payments = rows,
        }
    }
}

/// One unit of work: own session, one statement, decode.
async fn run_branch<S: Store>(
    store: Arc<S>,
    part: AggregatePart,
    order_id: i64,
) -> Result<BranchRows, BenchError> {
    let mut session = store.connect().await?;
    let set = session
        .query(sql::for_part(part), &Params::order_id(order_id))
        .await?;

    Ok(match part {
        AggregatePart::Order => BranchRows::Order(decode_rows(&set)?),
        AggregatePart::Items => BranchRows::Items(decode_rows(&set)?),
        AggregatePart::Shipping => BranchRows::Shipping(decode_rows(&set)?),
        AggregatePart::Payments => BranchRows::Payments(decode_rows(&set)?),
    })
}

pub async fn execute<S: Store>(store: &Arc<S>, order_id: i64) -> Result<Aggregate, BenchError> {
    let mut branches = JoinSet::new();
    let mut part_of_task = HashMap::with_capacity(AggregatePart::ALL.len());

    for part in AggregatePart::ALL {
        let store = Arc::clone(store);
        let handle = branches.spawn(run_branch(store, part, order_id));
        part_of_task.insert(handle.id(), part);
    }

    let mut parts = AggregateParts::default();
    let mut failures = Vec::new();

    while let Some(joined) = branches.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(join_err) => {
                let id = join_err.id();
                (id, Err(BenchError::query("parallel branch", join_err)))
            }
        };
        let Some(&part) = part_of_task.get(&id) else {
            return Err(BenchError::query(
                "parallel branch",
                format!("result from unknown task {id}"),
            ));
        };

        match outcome {
            Ok(rows) => rows.store_into(&mut parts),
            Err(error) => {
                log::debug!("parallel: {part} branch for order {order_id} failed: {error}");
                failures.push(BranchFailure { part, error });
            }
        }
    }

    if let Some(failures) = BranchFailures::from_failures(failures) {
        return Err(BenchError::ParallelBranch(failures));
    }

    let aggregate = parts.assemble(order_id)?;
    log::debug!(
        "parallel: order {order_id} assembled with {} items, {} payments",
        aggregate.items().len(),
        aggregate.payments().len()
    );
    Ok(aggregate)
}
