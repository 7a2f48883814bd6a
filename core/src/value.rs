//! Untyped result sets as a store returns them.

use std::fmt;
use std::sync::Arc;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Short kind name used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Blob(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Named statement parameters, in binding order.
///
/// Names are given without a sigil; the store decides how they are spelled in
/// SQL (`@id`, `:id`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// The one parameter every strategy binds: the order identifier as `id`.
    pub fn order_id(order_id: i64) -> Self {
        Self::new().with("id", order_id)
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.push((name.to_string(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One result set: column names and rows, in the order the store produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    columns: Arc<[String]>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns: columns.into(),
            rows: Vec::new(),
        }
    }

    /// Build a set from literal columns and rows; rows must be as wide as the
    /// column list.
    pub fn from_rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let mut set = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            set.push(row);
        }
        set
    }

    /// Append a row. Short rows are padded with nulls and long rows truncated
    /// so every row stays as wide as the column list.
    pub fn push(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(|values| RawRow {
            columns: &self.columns,
            values,
        })
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_index(&self.columns, name)
    }
}

fn column_index(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.eq_ignore_ascii_case(name))
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RawRow<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        column_index(self.columns, column).map(|idx| &self.values[idx])
    }

    pub fn columns(&self) -> &'a [String] {
        self.columns
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup_ignores_column_case() {
        let set = RowSet::from_rows(
            &["OrderId", "CustomerName"],
            vec![vec![Value::Integer(7), "Ada".into()]],
        );
        let row = set.rows().next().unwrap();
        assert_eq!(row.get("orderid"), Some(&Value::Integer(7)));
        assert_eq!(row.get("CUSTOMERNAME"), Some(&Value::Text("Ada".into())));
        assert_eq!(row.get("City"), None);
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let mut set = RowSet::new(vec!["a".into(), "b".into()]);
        set.push(vec![Value::Integer(1)]);
        let row = set.rows().next().unwrap();
        assert!(row.get("b").unwrap().is_null());
    }

    #[test]
    fn order_id_params_bind_id() {
        let params = Params::order_id(42);
        assert_eq!(params.get("id"), Some(&Value::Integer(42)));
        assert_eq!(params.iter().count(), 1);
    }
}
