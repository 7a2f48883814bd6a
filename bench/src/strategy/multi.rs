//! Multi-result-set strategy: one connection, one request carrying all four
//! statements, read back as four result sets in submission order.

use crate::sql;
use crate::store::{Session, Store};
use order_core::assemble::assemble;
use order_core::types::Aggregate;
use order_core::value::Params;
use order_core::BenchError;

pub async fn execute<S: Store>(store: &S, order_id: i64) -> Result<Aggregate, BenchError> {
    let mut session = store.connect().await?;
    let mut grid = session
        .query_multiple(sql::MULTIPLE, &Params::order_id(order_id))
        .await?;

    // Read order must match statement order in sql::MULTIPLE.
    let order = grid.read_single_or_none(|rows| BenchError::DuplicateOrder { order_id, rows })?;
    let items = grid.read()?;
    let shipping =
        grid.read_single_or_none(|rows| BenchError::AmbiguousShipping { order_id, rows })?;
    let payments = grid.read()?;
    if !grid.is_consumed() {
        log::warn!(
            "multi: response for order {order_id} carried {} result sets, read {}",
            grid.len(),
            grid.position()
        );
    }

    let aggregate = assemble(order_id, order, items, shipping, payments)?;
    log::debug!(
        "multi: order {order_id} assembled from {} result sets",
        grid.len()
    );
    Ok(aggregate)
}
