//! Statement text for every strategy. All statements bind the order id as `@id`.

use order_core::types::AggregatePart;

pub const ORDER: &str = "SELECT OrderId, OrderDate, CustomerName FROM Orders WHERE OrderId = @id";

pub const ITEMS: &str =
    "SELECT ProductName, Quantity, UnitPrice FROM OrderItems WHERE OrderId = @id";

pub const SHIPPING: &str =
    "SELECT Address, City, PostalCode, Country FROM ShippingDetails WHERE OrderId = @id";

pub const PAYMENTS: &str =
    "SELECT PaymentDate, Amount, PaymentMethod FROM Payments WHERE OrderId = @id";

/// The four statements above in one request, in issue order.
pub const MULTIPLE: &str = "
SELECT OrderId, OrderDate, CustomerName FROM Orders WHERE OrderId = @id;
SELECT ProductName, Quantity, UnitPrice FROM OrderItems WHERE OrderId = @id;
SELECT Address, City, PostalCode, Country FROM ShippingDetails WHERE OrderId = @id;
SELECT PaymentDate, Amount, PaymentMethod FROM Payments WHERE OrderId = @id;";

/// One wide statement; items × payments rows per order.
pub const JOIN: &str = "
SELECT
    o.OrderId, o.OrderDate, o.CustomerName,
    i.ProductName, i.Quantity, i.UnitPrice,
    s.Address, s.City, s.PostalCode, s.Country,
    p.PaymentDate, p.Amount, p.PaymentMethod
FROM Orders o
LEFT JOIN OrderItems i      ON o.OrderId = i.OrderId
LEFT JOIN ShippingDetails s ON o.OrderId = s.OrderId
LEFT JOIN Payments p        ON o.OrderId = p.OrderId
WHERE o.OrderId = @id";

/// Single-table statement for one part of the aggregate.
pub fn for_part(part: AggregatePart) -> &'static str {
    match part {
        AggregatePart::Order => ORDER,
        AggregatePart::Items => ITEMS,
        AggregatePart::Shipping => SHIPPING,
        AggregatePart::Payments => PAYMENTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_is_the_four_part_statements_in_order() {
        let statements: Vec<&str> = MULTIPLE
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let expected: Vec<&str> = AggregatePart::ALL.iter().map(|p| for_part(*p)).collect();
        assert_eq!(statements, expected);
    }
}
