//! Row decoder: raw rows to typed records.
//!
//! A result set is checked against the record's column list before any row is
//! converted, so a set decoded as the wrong record shape is rejected outright
//! instead of having its fields misassigned.

use crate::types::{FlatJoinRow, Order, OrderItem, Payment, Shipping};
use crate::value::{RawRow, RowSet, Value};
use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;
use thiserror::Error as ThisError;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum DecodeError {
    #[error("{record}: required column '{column}' is missing from the result set")]
    MissingColumn {
        record: &'static str,
        column: &'static str,
    },

    #[error("{record}: result set carries unknown column '{column}'")]
    UnexpectedColumn { record: &'static str, column: String },

    #[error("{record}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        record: &'static str,
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{record}.{column}: value {value} is not a valid {expected}")]
    InvalidValue {
        record: &'static str,
        column: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{record}.{column}: unexpected NULL")]
    UnexpectedNull {
        record: &'static str,
        column: &'static str,
    },
}

/// A record that can be built from one raw row.
pub trait FromRow: Sized {
    /// Record name used in errors.
    const RECORD: &'static str;

    /// Exact column list a result set must carry to decode as this record.
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError>;
}

/// Decode every row of `set` as `T`, preserving row order.
pub fn decode_rows<T: FromRow>(set: &RowSet) -> Result<Vec<T>, DecodeError> {
    check_shape::<T>(set)?;
    set.rows().map(|row| T::from_row(&row)).collect()
}

/// Reject sets whose columns are not exactly `T::COLUMNS`.
pub fn check_shape<T: FromRow>(set: &RowSet) -> Result<(), DecodeError> {
    if let Some(column) = T::COLUMNS
        .iter()
        .copied()
        .find(|column| set.column_index(column).is_none())
    {
        return Err(DecodeError::MissingColumn {
            record: T::RECORD,
            column,
        });
    }

    if let Some(column) = set
        .columns()
        .iter()
        .find(|c| !T::COLUMNS.iter().any(|known| known.eq_ignore_ascii_case(c)))
    {
        return Err(DecodeError::UnexpectedColumn {
            record: T::RECORD,
            column: column.clone(),
        });
    }

    // Known names can still appear twice.
    let columns = set.columns();
    if let Some(column) = columns
        .iter()
        .enumerate()
        .find(|(i, c)| columns[..*i].iter().any(|seen| seen.eq_ignore_ascii_case(c)))
        .map(|(_, c)| c)
    {
        return Err(DecodeError::UnexpectedColumn {
            record: T::RECORD,
            column: column.clone(),
        });
    }

    Ok(())
}

/// Typed column access for one record shape.
struct Fields<'r, 'a> {
    record: &'static str,
    row: &'r RawRow<'a>,
}

impl<'r, 'a> Fields<'r, 'a> {
    fn new(record: &'static str, row: &'r RawRow<'a>) -> Self {
        Self { record, row }
    }

    fn value(&self, column: &'static str) -> Result<&'a Value, DecodeError> {
        self.row.get(column).ok_or(DecodeError::MissingColumn {
            record: self.record,
            column,
        })
    }

    fn required<T>(
        &self,
        column: &'static str,
        convert: fn(&Self, &'static str, &Value) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        match self.value(column)? {
            Value::Null => Err(DecodeError::UnexpectedNull {
                record: self.record,
                column,
            }),
            value => convert(self, column, value),
        }
    }

    fn nullable<T>(
        &self,
        column: &'static str,
        convert: fn(&Self, &'static str, &Value) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            value => convert(self, column, value).map(Some),
        }
    }

    fn mismatch(&self, column: &'static str, expected: &'static str, value: &Value) -> DecodeError {
        DecodeError::TypeMismatch {
            record: self.record,
            column,
            expected,
            found: value.kind(),
        }
    }

    fn invalid(&self, column: &'static str, expected: &'static str, value: &Value) -> DecodeError {
        DecodeError::InvalidValue {
            record: self.record,
            column,
            expected,
            value: value.to_string(),
        }
    }

    fn int(&self, column: &'static str, value: &Value) -> Result<i64, DecodeError> {
        match value {
            Value::Integer(v) => Ok(*v),
            other => Err(self.mismatch(column, "integer", other)),
        }
    }

    fn text(&self, column: &'static str, value: &Value) -> Result<String, DecodeError> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(self.mismatch(column, "text", other)),
        }
    }

    fn decimal(&self, column: &'static str, value: &Value) -> Result<Decimal, DecodeError> {
        match value {
            Value::Integer(v) => Ok(Decimal::from(*v)),
            Value::Real(v) => {
                Decimal::from_f64(*v).ok_or_else(|| self.invalid(column, "decimal", value))
            }
            Value::Text(v) => {
                Decimal::from_str(v.trim()).map_err(|_| self.invalid(column, "decimal", value))
            }
            other => Err(self.mismatch(column, "decimal", other)),
        }
    }

    fn timestamp(&self, column: &'static str, value: &Value) -> Result<NaiveDateTime, DecodeError> {
        let Value::Text(raw) = value else {
            return Err(self.mismatch(column, "timestamp", value));
        };
        parse_timestamp(raw).ok_or_else(|| self.invalid(column, "timestamp", value))
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

impl FromRow for Order {
    const RECORD: &'static str = "Order";
    const COLUMNS: &'static [&'static str] = &["OrderId", "OrderDate", "CustomerName"];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        let f = Fields::new(Self::RECORD, row);
        Ok(Order {
            order_id: f.required("OrderId", Fields::int)?,
            order_date: f.required("OrderDate", Fields::timestamp)?,
            customer_name: f.required("CustomerName", Fields::text)?,
        })
    }
}

impl FromRow for OrderItem {
    const RECORD: &'static str = "OrderItem";
    const COLUMNS: &'static [&'static str] = &["ProductName", "Quantity", "UnitPrice"];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        let f = Fields::new(Self::RECORD, row);
        Ok(OrderItem {
            product_name: f.required("ProductName", Fields::text)?,
            quantity: f.required("Quantity", Fields::int)?,
            unit_price: f.required("UnitPrice", Fields::decimal)?,
        })
    }
}

impl FromRow for Shipping {
    const RECORD: &'static str = "Shipping";
    const COLUMNS: &'static [&'static str] = &["Address", "City", "PostalCode", "Country"];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        let f = Fields::new(Self::RECORD, row);
        Ok(Shipping {
            address: f.required("Address", Fields::text)?,
            city: f.required("City", Fields::text)?,
            postal_code: f.required("PostalCode", Fields::text)?,
            country: f.required("Country", Fields::text)?,
        })
    }
}

impl FromRow for Payment {
    const RECORD: &'static str = "Payment";
    const COLUMNS: &'static [&'static str] = &["PaymentDate", "Amount", "PaymentMethod"];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        let f = Fields::new(Self::RECORD, row);
        Ok(Payment {
            payment_date: f.required("PaymentDate", Fields::timestamp)?,
            amount: f.required("Amount", Fields::decimal)?,
            payment_method: f.required("PaymentMethod", Fields::text)?,
        })
    }
}

impl FromRow for FlatJoinRow {
    const RECORD: &'static str = "FlatJoinRow";
    const COLUMNS: &'static [&'static str] = &[
        "OrderId",
        "OrderDate",
        "CustomerName",
        "ProductName",
        "Quantity",
        "UnitPrice",
        "Address",
        "City",
        "PostalCode",
        "Country",
        "PaymentDate",
        "Amount",
        "PaymentMethod",
    ];

    fn from_row(row: &RawRow<'_>) -> Result<Self, DecodeError> {
        let f = Fields::new(Self::RECORD, row);
        Ok(FlatJoinRow {
            order_id: f.required("OrderId", Fields::int)?,
            order_date: f.required("OrderDate", Fields::timestamp)?,
            customer_name: f.required("CustomerName", Fields::text)?,
            product_name: f.nullable("ProductName", Fields::text)?,
            quantity: f.nullable("Quantity", Fields::int)?,
            unit_price: f.nullable("UnitPrice", Fields::decimal)?,
            address: f.nullable("Address", Fields::text)?,
            city: f.nullable("City", Fields::text)?,
            postal_code: f.nullable("PostalCode", Fields::text)?,
            country: f.nullable("Country", Fields::text)?,
            payment_date: f.nullable("PaymentDate", Fields::timestamp)?,
            amount: f.nullable("Amount", Fields::decimal)?,
            payment_method: f.nullable("PaymentMethod", Fields::text)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn item_set() -> RowSet {
        RowSet::from_rows(
            &["ProductName", "Quantity", "UnitPrice"],
            vec![
                vec!["Widget".into(), Value::Integer(2), "9.99".into()],
                vec!["Gadget".into(), Value::Integer(1), Value::Integer(25)],
            ],
        )
    }

    #[test]
    fn decodes_rows_in_input_order() {
        let items: Vec<OrderItem> = decode_rows(&item_set()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_name, "Widget");
        assert_eq!(items[0].unit_price, Decimal::new(999, 2));
        assert_eq!(items[1].product_name, "Gadget");
        assert_eq!(items[1].unit_price, Decimal::from(25));
    }

    #[test]
    fn decodes_order_timestamps_in_both_layouts() {
        let set = RowSet::from_rows(
            &["OrderId", "OrderDate", "CustomerName"],
            vec![
                vec![Value::Integer(1), "2024-03-01 10:00:00".into(), "Ada".into()],
                vec![Value::Integer(2), "2024-03-01T10:00:00".into(), "Bob".into()],
            ],
        );
        let orders: Vec<Order> = decode_rows(&set).unwrap();
        assert_eq!(orders[0].order_date, ts(2024, 3, 1, 10));
        assert_eq!(orders[1].order_date, ts(2024, 3, 1, 10));
    }

    #[test]
    fn item_set_decoded_as_payments_is_rejected() {
        let err = decode_rows::<Payment>(&item_set()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingColumn {
                record: "Payment",
                column: "PaymentDate",
            }
        );
    }

    #[test]
    fn unknown_column_is_rejected() {
        let set = RowSet::from_rows(
            &["ProductName", "Quantity", "UnitPrice", "Discount"],
            vec![],
        );
        let err = decode_rows::<OrderItem>(&set).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedColumn { column, .. } if column == "Discount"
        ));
    }

    #[test]
    fn repeated_column_is_rejected() {
        let set = RowSet::from_rows(
            &["ProductName", "Quantity", "UnitPrice", "quantity"],
            vec![],
        );
        let err = decode_rows::<OrderItem>(&set).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedColumn {
                record: "OrderItem",
                column: "quantity".to_string(),
            }
        );
    }

    #[test]
    fn shape_is_checked_even_for_empty_sets() {
        let set = RowSet::from_rows(&["Address", "City"], vec![]);
        assert!(decode_rows::<Shipping>(&set).is_err());
    }

    #[test]
    fn null_in_required_column_fails() {
        let set = RowSet::from_rows(
            &["PaymentDate", "Amount", "PaymentMethod"],
            vec![vec!["2024-01-01 00:00:00".into(), Value::Null, "card".into()]],
        );
        let err = decode_rows::<Payment>(&set).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedNull {
                record: "Payment",
                column: "Amount",
            }
        );
    }

    #[test]
    fn wrong_value_kind_is_a_type_mismatch() {
        let set = RowSet::from_rows(
            &["ProductName", "Quantity", "UnitPrice"],
            vec![vec!["Widget".into(), "two".into(), "1.00".into()]],
        );
        let err = decode_rows::<OrderItem>(&set).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch {
                column: "Quantity",
                expected: "integer",
                found: "text",
                ..
            }
        ));
    }

    #[test]
    fn unparsable_decimal_is_invalid() {
        let set = RowSet::from_rows(
            &["ProductName", "Quantity", "UnitPrice"],
            vec![vec!["Widget".into(), Value::Integer(1), "12,5".into()]],
        );
        assert!(matches!(
            decode_rows::<OrderItem>(&set).unwrap_err(),
            DecodeError::InvalidValue {
                column: "UnitPrice",
                ..
            }
        ));
    }

    #[test]
    fn flat_row_allows_null_outer_join_columns() {
        let mut values = vec![
            Value::Integer(5),
            "2024-05-05 12:00:00".into(),
            "Cy".into(),
        ];
        values.extend(std::iter::repeat_n(Value::Null, 10));
        let set = RowSet::from_rows(FlatJoinRow::COLUMNS, vec![values]);

        let rows: Vec<FlatJoinRow> = decode_rows(&set).unwrap();
        assert_eq!(rows[0].order_id, 5);
        assert!(rows[0].item().is_none());
        assert!(rows[0].shipping().is_none());
        assert!(rows[0].payment().is_none());
    }
}
