//! Sequential strategy: one connection, four round-trips issued one after
//! another. The baseline.

use crate::sql;
use crate::store::{Session, Store};
use order_core::assemble::AggregateParts;
use order_core::decode::decode_rows;
use order_core::types::Aggregate;
use order_core::value::Params;
use order_core::BenchError;

pub async fn execute<S: Store>(store: &S, order_id: i64) -> Result<Aggregate, BenchError> {
    let mut session = store.connect().await?;
    let params = Params::order_id(order_id);

    let orders = decode_rows(&session.query(sql::ORDER, &params).await?)?;
    let items = decode_rows(&session.query(sql::ITEMS, &params).await?)?;
    let shipping = decode_rows(&session.query(sql::SHIPPING, &params).await?)?;
    let payments = decode_rows(&session.query(sql::PAYMENTS, &params).await?)?;

    let aggregate = AggregateParts {
        orders,
        items,
        shipping,
        payments,
    }
    .assemble(order_id)?;

    log::debug!(
        "sequential: order {order_id} assembled with {} items, {} payments",
        aggregate.items().len(),
        aggregate.payments().len()
    );
    Ok(aggregate)
}
