//! Demo schema and data: the four order tables and deterministic rows for them.
//!
//! Rows are written through [`Session::execute_bulk`]: one prepared INSERT per
//! table with bound values, all inside one transaction, so any
//! [`Store`](crate::store::Store) can be seeded.

use crate::store::{BulkStatement, Session};
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use order_core::decode::{decode_rows, DecodeError, FromRow};
use order_core::types::{Order, OrderItem, Payment, Shipping};
use order_core::value::{Params, RawRow, Value};
use order_core::BenchError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const SEED: u64 = 0x0DE5_CAFE_2024_0001;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS Orders (
    OrderId      INTEGER PRIMARY KEY,
    OrderDate    TEXT NOT NULL,
    CustomerName TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS OrderItems (
    OrderItemId  INTEGER PRIMARY KEY,
    OrderId      INTEGER NOT NULL REFERENCES Orders(OrderId),
    ProductName  TEXT NOT NULL,
    Quantity     INTEGER NOT NULL,
    UnitPrice    TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS ShippingDetails (
    ShippingId   INTEGER PRIMARY KEY,
    OrderId      INTEGER NOT NULL REFERENCES Orders(OrderId),
    Address      TEXT NOT NULL,
    City         TEXT NOT NULL,
    PostalCode   TEXT NOT NULL,
    Country      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS Payments (
    PaymentId     INTEGER PRIMARY KEY,
    OrderId       INTEGER NOT NULL REFERENCES Orders(OrderId),
    PaymentDate   TEXT NOT NULL,
    Amount        TEXT NOT NULL,
    PaymentMethod TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_OrderItems_OrderId ON OrderItems(OrderId);
CREATE INDEX IF NOT EXISTS IX_ShippingDetails_OrderId ON ShippingDetails(OrderId);
CREATE INDEX IF NOT EXISTS IX_Payments_OrderId ON Payments(OrderId);";

const PRODUCTS: &[&str] = &[
    "Mechanical Keyboard",
    "USB-C Hub",
    "27\" Monitor",
    "Desk Lamp",
    "Noise-Cancelling Headphones",
    "Laptop Stand",
    "Webcam",
    "Ergonomic Mouse",
];

const CUSTOMERS: &[&str] = &[
    "Ada Lovelace",
    "Grace Hopper",
    "Alan Turing",
    "Edsger Dijkstra",
    "Barbara Liskov",
    "Ken Thompson",
];

const CITIES: &[(&str, &str)] = &[
    ("Athens", "Greece"),
    ("Lisbon", "Portugal"),
    ("Leeds", "United Kingdom"),
    ("Lyon", "France"),
    ("O'Fallon", "United States"),
];

const PAYMENT_METHODS: &[&str] = &["card", "bank-transfer", "paypal", "gift-card"];

/// Shape of the generated data set.
#[derive(Debug, Clone, Copy)]
pub struct SeedParams {
    pub orders: usize,
    pub items_per_order: usize,
    pub payments_per_order: usize,
    /// Every n-th order is left without shipping. 0 ships everything.
    pub unshipped_every: usize,
}

impl SeedParams {
    /// 100 orders, 2 items and 3 payments each; every 10th order unshipped.
    pub fn standard() -> Self {
        Self {
            orders: 100,
            items_per_order: 2,
            payments_per_order: 3,
            unshipped_every: 10,
        }
    }

    /// 1,000 orders with wider fan-out, to make the JOIN duplication hurt.
    pub fn wide() -> Self {
        Self {
            orders: 1_000,
            items_per_order: 10,
            payments_per_order: 5,
            unshipped_every: 10,
        }
    }
}

/// All rows for one order. `shipping` may hold more than one row to model an
/// integrity violation.
#[derive(Debug, Clone)]
pub struct SeedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipping: Vec<Shipping>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub orders: Vec<SeedOrder>,
}

impl SeedData {
    /// Deterministic data for `params`; order ids run from 1.
    pub fn generate(params: &SeedParams) -> Self {
        let mut rng = StdRng::seed_from_u64(SEED);
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap_or_default();

        let orders = (1..=params.orders)
            .map(|n| {
                let order_date = base + ChronoDuration::minutes(rng.gen_range(0..60 * 24 * 365));
                let order = Order {
                    order_id: n as i64,
                    order_date,
                    customer_name: CUSTOMERS[rng.gen_range(0..CUSTOMERS.len())].to_string(),
                };

                let items = (0..params.items_per_order)
                    .map(|_| OrderItem {
                        product_name: PRODUCTS[rng.gen_range(0..PRODUCTS.len())].to_string(),
                        quantity: rng.gen_range(1..5),
                        unit_price: Decimal::new(rng.gen_range(199..49_999), 2),
                    })
                    .collect();

                let shipped = params.unshipped_every == 0 || n % params.unshipped_every != 0;
                let shipping = if shipped {
                    let (city, country) = CITIES[rng.gen_range(0..CITIES.len())];
                    vec![Shipping {
                        address: format!("{} Market Street", rng.gen_range(1..400)),
                        city: city.to_string(),
                        postal_code: format!("{:05}", rng.gen_range(1_000..99_999)),
                        country: country.to_string(),
                    }]
                } else {
                    Vec::new()
                };

                let payments = (0..params.payments_per_order)
                    .map(|k| Payment {
                        payment_date: order_date + ChronoDuration::hours(k as i64 * 24 + 1),
                        amount: Decimal::new(rng.gen_range(500..25_000), 2),
                        payment_method: PAYMENT_METHODS[rng.gen_range(0..PAYMENT_METHODS.len())]
                            .to_string(),
                    })
                    .collect();

                SeedOrder {
                    order,
                    items,
                    shipping,
                    payments,
                }
            })
            .collect();

        Self { orders }
    }

    pub fn push(&mut self, order: SeedOrder) {
        self.orders.push(order);
    }

    pub fn get(&self, order_id: i64) -> Option<&SeedOrder> {
        self.orders.iter().find(|o| o.order.order_id == order_id)
    }

    /// One prepared INSERT per table, with a parameter set for every row.
    pub fn insert_statements(&self) -> Vec<BulkStatement> {
        let mut orders = BulkStatement::new(
            "INSERT INTO Orders (OrderId, OrderDate, CustomerName) \
             VALUES (@id, @date, @customer)",
        );
        let mut items = BulkStatement::new(
            "INSERT INTO OrderItems (OrderId, ProductName, Quantity, UnitPrice) \
             VALUES (@id, @product, @quantity, @price)",
        );
        let mut shipping = BulkStatement::new(
            "INSERT INTO ShippingDetails (OrderId, Address, City, PostalCode, Country) \
             VALUES (@id, @address, @city, @postal_code, @country)",
        );
        let mut payments = BulkStatement::new(
            "INSERT INTO Payments (OrderId, PaymentDate, Amount, PaymentMethod) \
             VALUES (@id, @date, @amount, @method)",
        );

        for seed in &self.orders {
            let id = seed.order.order_id;
            orders.push(
                Params::order_id(id)
                    .with("date", timestamp(&seed.order.order_date))
                    .with("customer", seed.order.customer_name.as_str()),
            );
            for item in &seed.items {
                items.push(
                    Params::order_id(id)
                        .with("product", item.product_name.as_str())
                        .with("quantity", item.quantity)
                        .with("price", item.unit_price.to_string()),
                );
            }
            for ship in &seed.shipping {
                shipping.push(
                    Params::order_id(id)
                        .with("address", ship.address.as_str())
                        .with("city", ship.city.as_str())
                        .with("postal_code", ship.postal_code.as_str())
                        .with("country", ship.country.as_str()),
                );
            }
            for payment in &seed.payments {
                payments.push(
                    Params::order_id(id)
                        .with("date", timestamp(&payment.payment_date))
                        .with("amount", payment.amount.to_string())
                        .with("method", payment.payment_method.as_str()),
                );
            }
        }

        vec![orders, items, shipping, payments]
    }
}

fn timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Create the four tables and their `OrderId` indexes if missing.
pub async fn create_schema<T: Session>(session: &mut T) -> Result<(), BenchError> {
    session.execute(SCHEMA).await
}

/// Write `data`; the schema must exist.
pub async fn seed<T: Session>(session: &mut T, data: &SeedData) -> Result<(), BenchError> {
    let rows = session.execute_bulk(data.insert_statements()).await?;
    log::info!("seeded {} orders ({rows} rows)", data.orders.len());
    Ok(())
}

/// Number of orders stored, or `None` when the Orders table does not exist.
pub async fn order_count<T: Session>(session: &mut T) -> Result<Option<i64>, BenchError> {
    let tables = session
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = @name",
            &Params::new().with("name", "Orders"),
        )
        .await?;
    if tables.is_empty() {
        return Ok(None);
    }

    let counted = decode_rows::<OrderCount>(
        &session
            .query("SELECT COUNT(*) AS OrderCount FROM Orders", &Params::new())
            .await?,
    )?;
    Ok(counted.first().map(|c| c.0))
}

struct OrderCount(i64);

impl FromRow for OrderCount {
    const RECORD: &'static str = "OrderCount";
    const COLUMNS: &'static [&'static str] = &["OrderCount"];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        match row.get("OrderCount") {
            Some(Value::Integer(n)) => Ok(OrderCount(*n)),
            Some(other) => Err(DecodeError::TypeMismatch {
                record: Self::RECORD,
                column: "OrderCount",
                expected: "integer",
                found: other.kind(),
            }),
            None => Err(DecodeError::MissingColumn {
                record: Self::RECORD,
                column: "OrderCount",
            }),
        }
    }
}

/// Create the schema and seed `params` unless orders are already present.
pub async fn ensure_seeded<T: Session>(
    session: &mut T,
    params: &SeedParams,
) -> Result<SeedData, BenchError> {
    let data = SeedData::generate(params);
    match order_count(session).await? {
        Some(n) if n > 0 => {
            log::info!("database already holds {n} orders, not seeding");
        }
        _ => {
            create_schema(session).await?;
            seed(session, &data).await?;
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let a = SeedData::generate(&SeedParams::standard());
        let b = SeedData::generate(&SeedParams::standard());
        assert_eq!(a.orders.len(), 100);
        assert_eq!(a.orders[0].order, b.orders[0].order);
        assert_eq!(a.orders[99].payments, b.orders[99].payments);
    }

    #[test]
    fn every_nth_order_is_unshipped() {
        let data = SeedData::generate(&SeedParams::standard());
        assert!(data.get(10).unwrap().shipping.is_empty());
        assert_eq!(data.get(11).unwrap().shipping.len(), 1);
        assert_eq!(data.get(1).unwrap().items.len(), 2);
        assert_eq!(data.get(1).unwrap().payments.len(), 3);
    }

    #[test]
    fn insert_statements_bind_every_row() {
        let data = SeedData::generate(&SeedParams {
            orders: 2,
            items_per_order: 3,
            payments_per_order: 1,
            unshipped_every: 2,
        });
        let statements = data.insert_statements();
        let counts: Vec<usize> = statements.iter().map(|s| s.rows.len()).collect();
        assert_eq!(counts, vec![2, 6, 1, 2]);
        assert!(statements.iter().all(|s| !s.sql.contains('\'')));

        let first_item = &statements[1].rows[0];
        let item = &data.get(1).unwrap().items[0];
        assert_eq!(first_item.get("id"), Some(&Value::Integer(1)));
        assert_eq!(
            first_item.get("price"),
            Some(&Value::Text(item.unit_price.to_string()))
        );
    }
}
