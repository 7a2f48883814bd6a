//! The relational store contract the strategies are written against.
//!
//! Two implementations are provided:
//! - [`sqlite::SqliteStore`]: rusqlite-backed, one connection per session
//! - [`recording::RecordingStore`]: wraps another store and records every
//!   connection and request, for asserting round-trip counts

pub mod recording;
pub mod sqlite;

use order_core::assemble::single_or_none;
use order_core::decode::{decode_rows, FromRow};
use order_core::{BenchError, value::Params, value::RowSet};
use std::future::Future;

/// A source of independent sessions.
pub trait Store: Send + Sync + 'static {
    type Session: Session;

    /// Human-readable target for logs and connection errors.
    fn target(&self) -> &str;

    /// Acquire a fresh session. The session is released when dropped.
    fn connect(&self) -> impl Future<Output = Result<Self::Session, BenchError>> + Send;
}

/// One live connection. Every method call is exactly one round-trip.
pub trait Session: Send + 'static {
    /// Run one statement and return its result set.
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<RowSet, BenchError>> + Send;

    /// Run every statement in `sql` in a single request and return the result
    /// sets in statement order.
    fn query_multiple(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<GridReader, BenchError>> + Send;

    /// Run a batch of statements that return no rows (schema, seed data).
    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<(), BenchError>> + Send;

    /// Run each statement once per parameter set, all inside one transaction,
    /// in a single request. Returns the number of rows changed.
    fn execute_bulk(
        &mut self,
        statements: Vec<BulkStatement>,
    ) -> impl Future<Output = Result<usize, BenchError>> + Send;

    /// Liveness check: `SELECT 1`.
    fn ping(&mut self) -> impl Future<Output = Result<(), BenchError>> + Send {
        async move {
            let set = self.query("SELECT 1", &Params::new()).await?;
            if set.len() == 1 {
                Ok(())
            } else {
                Err(BenchError::query(
                    "liveness check",
                    format!("SELECT 1 returned {} rows", set.len()),
                ))
            }
        }
    }
}

/// A prepared statement and the parameter sets to execute it with.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkStatement {
    pub sql: String,
    pub rows: Vec<Params>,
}

impl BulkStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, params: Params) {
        self.rows.push(params);
    }
}

/// Ordered reader over the result sets of one multi-statement response.
///
/// Sets can only be consumed front to back. Decoding a set as the wrong
/// record shape fails instead of misassigning fields.
#[derive(Debug)]
pub struct GridReader {
    sets: std::vec::IntoIter<RowSet>,
    position: usize,
    available: usize,
}

impl GridReader {
    pub fn new(sets: Vec<RowSet>) -> Self {
        let available = sets.len();
        Self {
            sets: sets.into_iter(),
            position: 0,
            available,
        }
    }

    /// Number of result sets in the response.
    pub fn len(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Index of the next set to be read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_consumed(&self) -> bool {
        self.position == self.available
    }

    /// Take the next raw set.
    pub fn next_set(&mut self) -> Result<RowSet, BenchError> {
        let set = self.sets.next().ok_or(BenchError::ResultSetExhausted {
            index: self.position,
            available: self.available,
        })?;
        self.position += 1;
        Ok(set)
    }

    /// Decode the next set as `T`.
    pub fn read<T: FromRow>(&mut self) -> Result<Vec<T>, BenchError> {
        let index = self.position;
        let set = self.next_set()?;
        decode_rows(&set).map_err(|err| {
            log::debug!("result set {index} does not decode as {}: {err}", T::RECORD);
            BenchError::from(err)
        })
    }

    /// Decode the next set as at most one `T`. More rows than that is turned
    /// into an error by `on_many`, which receives the row count.
    pub fn read_single_or_none<T: FromRow>(
        &mut self,
        on_many: impl FnOnce(usize) -> BenchError,
    ) -> Result<Option<T>, BenchError> {
        single_or_none(self.read()?).map_err(on_many)
    }
}
