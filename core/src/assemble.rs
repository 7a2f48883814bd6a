//! Aggregate assembler.
//!
//! Pure in-memory composition: no I/O, deterministic for its inputs.

use crate::error::BenchError;
use crate::types::{Aggregate, FlatJoinRow, Order, OrderItem, Payment, Shipping};

/// Compose one aggregate.
///
/// Empty `items` / `payments` and an absent `shipping` are valid. An absent
/// `order` means the identifier does not exist.
pub fn assemble(
    order_id: i64,
    order: Option<Order>,
    items: Vec<OrderItem>,
    shipping: Option<Shipping>,
    payments: Vec<Payment>,
) -> Result<Aggregate, BenchError> {
    let order = order.ok_or(BenchError::MissingOrder { order_id })?;
    Ok(Aggregate::new(order, items, shipping, payments))
}

/// Expect zero or one row. On failure returns how many rows there were.
pub fn single_or_none<T>(rows: Vec<T>) -> Result<Option<T>, usize> {
    if rows.len() > 1 {
        return Err(rows.len());
    }
    Ok(rows.into_iter().next())
}

/// The four decoded row vectors of one aggregate, before reduction.
#[derive(Debug, Clone, Default)]
pub struct AggregateParts {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub shipping: Vec<Shipping>,
    pub payments: Vec<Payment>,
}

impl AggregateParts {
    /// Apply the single-or-none checks to the order and shipping rows, then
    /// assemble.
    pub fn assemble(self, order_id: i64) -> Result<Aggregate, BenchError> {
        let order = single_or_none(self.orders)
            .map_err(|rows| BenchError::DuplicateOrder { order_id, rows })?;
        let shipping = single_or_none(self.shipping)
            .map_err(|rows| BenchError::AmbiguousShipping { order_id, rows })?;
        assemble(order_id, order, self.items, shipping, self.payments)
    }
}

impl FlatJoinRow {
    /// Undo the join fan-out.
    ///
    /// Rows are read in the order the join produces them: one block per item
    /// line, each block one run per shipping row, each run one row per
    /// payment. Line counts come from that layout rather than from distinct
    /// values, so identical lines that exist in the tables are kept. Where two
    /// layouts yield the same rows (repeated payments under repeated items)
    /// the one with fewer payments per item is taken. All rows must belong to
    /// `order_id`.
    pub fn normalize(order_id: i64, rows: &[FlatJoinRow]) -> Result<Aggregate, BenchError> {
        let rows: Vec<&FlatJoinRow> = rows.iter().filter(|r| r.order_id == order_id).collect();
        let Some(first) = rows.first() else {
            return Err(BenchError::MissingOrder { order_id });
        };

        let items: Vec<Option<OrderItem>> = rows.iter().map(|r| r.item()).collect();
        let shipping: Vec<Option<Shipping>> = rows.iter().map(|r| r.shipping()).collect();
        let payments: Vec<Option<Payment>> = rows.iter().map(|r| r.payment()).collect();
        let unshaped = || BenchError::UnshapedJoin {
            order_id,
            rows: rows.len(),
        };

        let block = fan_out_block(
            rows.len(),
            |a, b| shipping[a] == shipping[b] && payments[a] == payments[b],
            |a, b| items[a] == items[b],
        )
        .ok_or_else(unshaped)?;
        let run = fan_out_block(block, |a, b| payments[a] == payments[b], |a, b| {
            shipping[a] == shipping[b]
        })
        .ok_or_else(unshaped)?;

        let item_lines = (0..rows.len())
            .step_by(block)
            .filter_map(|k| items[k].clone())
            .collect();
        let payment_lines = payments[..run].iter().flatten().cloned().collect();
        let shipping_rows = (0..block)
            .step_by(run)
            .filter_map(|k| shipping[k].clone())
            .collect();
        let shipping = single_or_none(shipping_rows)
            .map_err(|rows| BenchError::AmbiguousShipping { order_id, rows })?;

        assemble(order_id, Some(first.order()), item_lines, shipping, payment_lines)
    }
}

/// Smallest block length dividing `len` such that the inner columns repeat
/// with that period and the outer columns are constant within each block.
fn fan_out_block(
    len: usize,
    same_inner: impl Fn(usize, usize) -> bool,
    same_outer: impl Fn(usize, usize) -> bool,
) -> Option<usize> {
    (1..=len).filter(|m| len % m == 0).find(|&m| {
        (m..len).all(|k| same_inner(k, k % m)) && (0..len).all(|k| same_outer(k, k - k % m))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn order() -> Order {
        Order {
            order_id: 1,
            order_date: at(1),
            customer_name: "Ada Lovelace".into(),
        }
    }

    fn item(name: &str, quantity: i64, cents: i64) -> OrderItem {
        OrderItem {
            product_name: name.into(),
            quantity,
            unit_price: Decimal::new(cents, 2),
        }
    }

    fn shipping(city: &str) -> Shipping {
        Shipping {
            address: "1 Main St".into(),
            city: city.into(),
            postal_code: "12345".into(),
            country: "UK".into(),
        }
    }

    fn payment(day: u32, cents: i64) -> Payment {
        Payment {
            payment_date: at(day),
            amount: Decimal::new(cents, 2),
            payment_method: "card".into(),
        }
    }

    #[test]
    fn missing_order_fails() {
        let err = assemble(1, None, vec![], None, vec![]).unwrap_err();
        assert!(matches!(err, BenchError::MissingOrder { order_id: 1 }));
    }

    #[test]
    fn order_without_children_is_valid() {
        let agg = assemble(1, Some(order()), vec![], None, vec![]).unwrap();
        assert_eq!(agg.order(), &order());
        assert!(agg.items().is_empty());
        assert!(agg.shipping().is_none());
        assert!(agg.payments().is_empty());
    }

    #[test]
    fn children_keep_input_order() {
        let items = vec![item("b", 1, 100), item("a", 2, 250)];
        let payments = vec![payment(3, 300), payment(2, 300)];
        let agg = assemble(
            1,
            Some(order()),
            items.clone(),
            Some(shipping("Leeds")),
            payments.clone(),
        )
        .unwrap();

        assert_eq!(agg.items(), &items[..]);
        assert_eq!(agg.payments(), &payments[..]);
        assert_eq!(agg.shipping().unwrap().city, "Leeds");
        assert_eq!(agg.item_total(), Decimal::new(600, 2));
        assert_eq!(agg.paid_total(), Decimal::new(600, 2));
    }

    #[test]
    fn single_or_none_reduction() {
        assert_eq!(single_or_none::<u8>(vec![]), Ok(None));
        assert_eq!(single_or_none(vec![7]), Ok(Some(7)));
        assert_eq!(single_or_none(vec![7, 8, 9]), Err(3));
    }

    #[test]
    fn two_shipping_rows_are_ambiguous() {
        let parts = AggregateParts {
            orders: vec![order()],
            items: vec![item("a", 1, 100)],
            shipping: vec![shipping("Leeds"), shipping("York")],
            payments: vec![],
        };
        let err = parts.assemble(1).unwrap_err();
        assert!(matches!(
            err,
            BenchError::AmbiguousShipping {
                order_id: 1,
                rows: 2
            }
        ));
    }

    #[test]
    fn duplicate_order_rows_fail() {
        let parts = AggregateParts {
            orders: vec![order(), order()],
            ..Default::default()
        };
        assert!(matches!(
            parts.assemble(1).unwrap_err(),
            BenchError::DuplicateOrder { rows: 2, .. }
        ));
    }

    #[test]
    fn parts_without_order_fail_as_missing() {
        let parts = AggregateParts::default();
        assert!(matches!(
            parts.assemble(9).unwrap_err(),
            BenchError::MissingOrder { order_id: 9 }
        ));
    }

    fn flat(item: Option<&OrderItem>, payment: Option<&Payment>, ship: bool) -> FlatJoinRow {
        let o = order();
        let s = ship.then(|| shipping("Leeds"));
        FlatJoinRow {
            order_id: o.order_id,
            order_date: o.order_date,
            customer_name: o.customer_name,
            product_name: item.map(|i| i.product_name.clone()),
            quantity: item.map(|i| i.quantity),
            unit_price: item.map(|i| i.unit_price),
            address: s.as_ref().map(|s| s.address.clone()),
            city: s.as_ref().map(|s| s.city.clone()),
            postal_code: s.as_ref().map(|s| s.postal_code.clone()),
            country: s.as_ref().map(|s| s.country.clone()),
            payment_date: payment.map(|p| p.payment_date),
            amount: payment.map(|p| p.amount),
            payment_method: payment.map(|p| p.payment_method.clone()),
        }
    }

    #[test]
    fn normalize_undoes_item_payment_fan_out() {
        let items = [item("a", 1, 100), item("b", 2, 200)];
        let payments = [payment(1, 100), payment(2, 200), payment(3, 300)];
        let rows = fan_out(&items, &payments);
        assert_eq!(rows.len(), 6);

        let agg = FlatJoinRow::normalize(1, &rows).unwrap();
        assert_eq!(agg.items(), &items[..]);
        assert_eq!(agg.payments(), &payments[..]);
        assert_eq!(agg.shipping(), Some(&shipping("Leeds")));
    }

    fn fan_out(items: &[OrderItem], payments: &[Payment]) -> Vec<FlatJoinRow> {
        items
            .iter()
            .flat_map(|i| payments.iter().map(move |p| flat(Some(i), Some(p), true)))
            .collect()
    }

    #[test]
    fn normalize_keeps_identical_item_lines() {
        let a = item("a", 1, 100);
        let payments = [payment(1, 100), payment(2, 200)];
        let rows = fan_out(&[a.clone(), a.clone()], &payments);
        assert_eq!(rows.len(), 4);

        let agg = FlatJoinRow::normalize(1, &rows).unwrap();
        assert_eq!(agg.items(), &[a.clone(), a][..]);
        assert_eq!(agg.payments(), &payments[..]);
    }

    #[test]
    fn normalize_keeps_identical_payment_lines() {
        let items = [item("a", 1, 100), item("b", 2, 200)];
        let p = payment(1, 100);
        let rows = fan_out(&items, &[p.clone(), payment(2, 50), p.clone()]);

        let agg = FlatJoinRow::normalize(1, &rows).unwrap();
        assert_eq!(agg.items(), &items[..]);
        assert_eq!(agg.payments(), &[p.clone(), payment(2, 50), p][..]);
    }

    #[test]
    fn normalize_rejects_two_shipping_rows() {
        let items = [item("a", 1, 100), item("b", 2, 200)];
        let payments = &[payment(1, 100), payment(2, 200)];
        let rows: Vec<FlatJoinRow> = items
            .iter()
            .flat_map(|i| {
                ["Leeds", "York"].into_iter().flat_map(move |city| {
                    payments.iter().map(move |p| FlatJoinRow {
                        city: Some(city.to_string()),
                        ..flat(Some(i), Some(p), true)
                    })
                })
            })
            .collect();
        assert_eq!(rows.len(), 8);

        assert!(matches!(
            FlatJoinRow::normalize(1, &rows).unwrap_err(),
            BenchError::AmbiguousShipping {
                order_id: 1,
                rows: 2
            }
        ));
    }

    #[test]
    fn normalize_rejects_rows_out_of_join_order() {
        let (a, b) = (item("a", 1, 100), item("b", 2, 200));
        let (p1, p2) = (payment(1, 100), payment(2, 200));
        let rows = vec![
            flat(Some(&a), Some(&p1), true),
            flat(Some(&b), Some(&p1), true),
            flat(Some(&a), Some(&p2), true),
            flat(Some(&b), Some(&p2), true),
        ];

        assert!(matches!(
            FlatJoinRow::normalize(1, &rows).unwrap_err(),
            BenchError::UnshapedJoin {
                order_id: 1,
                rows: 4
            }
        ));
    }

    #[test]
    fn normalize_handles_unmatched_outer_sides() {
        let rows = vec![flat(None, None, false)];
        let agg = FlatJoinRow::normalize(1, &rows).unwrap();
        assert!(agg.items().is_empty());
        assert!(agg.payments().is_empty());
        assert!(agg.shipping().is_none());

        assert!(matches!(
            FlatJoinRow::normalize(2, &rows).unwrap_err(),
            BenchError::MissingOrder { order_id: 2 }
        ));
    }
}
