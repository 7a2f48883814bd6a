//! Typed records for the four order tables and the assembled aggregate.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::fmt;

/// Order header. Root of the aggregate, exactly one per identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: i64,
    pub order_date: NaiveDateTime,
    pub customer_name: String,
}

/// One order line. No identity beyond the order it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Shipping details; zero or one per order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipping {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// One payment; zero or more per order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub payment_date: NaiveDateTime,
    pub amount: Decimal,
    pub payment_method: String,
}

/// The four queries an aggregate is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregatePart {
    Order,
    Items,
    Shipping,
    Payments,
}

impl AggregatePart {
    /// Issue order shared by the sequential and multi-result-set strategies.
    pub const ALL: [AggregatePart; 4] = [
        AggregatePart::Order,
        AggregatePart::Items,
        AggregatePart::Shipping,
        AggregatePart::Payments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AggregatePart::Order => "order",
            AggregatePart::Items => "items",
            AggregatePart::Shipping => "shipping",
            AggregatePart::Payments => "payments",
        }
    }
}

impl fmt::Display for AggregatePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Order header plus everything hanging off it.
///
/// Built fresh by the assembler for every invocation and never mutated
/// afterwards; fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    order: Order,
    items: Vec<OrderItem>,
    shipping: Option<Shipping>,
    payments: Vec<Payment>,
}

impl Aggregate {
    pub(crate) fn new(
        order: Order,
        items: Vec<OrderItem>,
        shipping: Option<Shipping>,
        payments: Vec<Payment>,
    ) -> Self {
        Self {
            order,
            items,
            shipping,
            payments,
        }
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping(&self) -> Option<&Shipping> {
        self.shipping.as_ref()
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Sum of quantity × unit price over all items.
    pub fn item_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn paid_total(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

/// One row of the wide LEFT JOIN across all four tables.
///
/// Order columns are always present. Item, shipping and payment columns are
/// null when the order has no matching row on that side. Order and shipping
/// values repeat on every row of the item × payment fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatJoinRow {
    pub order_id: i64,
    pub order_date: NaiveDateTime,
    pub customer_name: String,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub payment_date: Option<NaiveDateTime>,
    pub amount: Option<Decimal>,
    pub payment_method: Option<String>,
}

impl FlatJoinRow {
    pub fn order(&self) -> Order {
        Order {
            order_id: self.order_id,
            order_date: self.order_date,
            customer_name: self.customer_name.clone(),
        }
    }

    /// Item columns, if this row matched an item.
    pub fn item(&self) -> Option<OrderItem> {
        Some(OrderItem {
            product_name: self.product_name.clone()?,
            quantity: self.quantity?,
            unit_price: self.unit_price?,
        })
    }

    pub fn shipping(&self) -> Option<Shipping> {
        Some(Shipping {
            address: self.address.clone()?,
            city: self.city.clone()?,
            postal_code: self.postal_code.clone()?,
            country: self.country.clone()?,
        })
    }

    pub fn payment(&self) -> Option<Payment> {
        Some(Payment {
            payment_date: self.payment_date?,
            amount: self.amount?,
            payment_method: self.payment_method.clone()?,
        })
    }
}

/// What a strategy hands back to the bench driver.
///
/// Three strategies assemble an [`Aggregate`]; the join strategy returns the
/// duplicated wide rows untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorResult {
    Aggregate(Aggregate),
    FlatRows(Vec<FlatJoinRow>),
}

impl ExecutorResult {
    /// Number of records carried: 1 + items + shipping + payments for an
    /// aggregate, the raw row count for flat rows.
    pub fn row_count(&self) -> usize {
        match self {
            ExecutorResult::Aggregate(agg) => {
                1 + agg.items.len() + usize::from(agg.shipping.is_some()) + agg.payments.len()
            }
            ExecutorResult::FlatRows(rows) => rows.len(),
        }
    }

    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self {
            ExecutorResult::Aggregate(agg) => Some(agg),
            ExecutorResult::FlatRows(_) => None,
        }
    }

    pub fn into_aggregate(self) -> Option<Aggregate> {
        match self {
            ExecutorResult::Aggregate(agg) => Some(agg),
            ExecutorResult::FlatRows(_) => None,
        }
    }

    pub fn as_flat_rows(&self) -> Option<&[FlatJoinRow]> {
        match self {
            ExecutorResult::Aggregate(_) => None,
            ExecutorResult::FlatRows(rows) => Some(rows),
        }
    }
}
