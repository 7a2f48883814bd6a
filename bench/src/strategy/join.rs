//! JOIN strategy: one connection, one wide statement. Shaping is pushed to the
//! server and the fan-out duplication is accepted; the raw rows are the
//! measured output and no aggregate is assembled.

use crate::sql;
use crate::store::{Session, Store};
use order_core::decode::decode_rows;
use order_core::types::FlatJoinRow;
use order_core::value::Params;
use order_core::BenchError;

pub async fn execute<S: Store>(store: &S, order_id: i64) -> Result<Vec<FlatJoinRow>, BenchError> {
    let mut session = store.connect().await?;
    let set = session.query(sql::JOIN, &Params::order_id(order_id)).await?;
    let rows = decode_rows(&set)?;

    log::debug!("join: order {order_id} returned {} flat rows", set.len());
    Ok(rows)
}
