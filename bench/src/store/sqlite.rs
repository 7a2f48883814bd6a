//! SQLite store: every session owns one rusqlite connection.
//!
//! rusqlite is blocking, so each request is shipped to tokio's blocking pool.
//! That hand-off is the async suspension point of a round-trip.

use super::{BulkStatement, GridReader, Session, Store};
use order_core::value::{Params, RowSet, Value};
use order_core::BenchError;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Batch, Connection, OpenFlags, Statement};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameter sigils tried, in order, when binding a named parameter.
const PARAM_SIGILS: [char; 3] = ['@', ':', '$'];

pub struct SqliteStore {
    target: String,
    busy_timeout: Duration,
    /// Keeps a shared-cache in-memory database alive between sessions.
    anchor: Option<Mutex<Connection>>,
}

impl SqliteStore {
    /// A store over a database file path or SQLite URI. Nothing is opened
    /// until the first session is requested.
    pub fn open(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            anchor: None,
        }
    }

    /// A named in-memory database shared by every session of this store.
    ///
    /// Distinct names give fully isolated databases within one process.
    pub fn shared_memory(name: &str) -> Result<Self, BenchError> {
        let target = format!("file:{name}?mode=memory&cache=shared");
        let anchor = open_connection(&target, DEFAULT_BUSY_TIMEOUT)
            .map_err(|err| BenchError::connection(target.clone(), err))?;
        Ok(Self {
            target,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            anchor: Some(Mutex::new(anchor)),
        })
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn is_shared_memory(&self) -> bool {
        self.anchor.is_some()
    }
}

fn open_connection(target: &str, busy_timeout: Duration) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(target, OpenFlags::default())?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

impl Store for SqliteStore {
    type Session = SqliteSession;

    fn target(&self) -> &str {
        &self.target
    }

    fn connect(&self) -> impl Future<Output = Result<SqliteSession, BenchError>> + Send {
        let target = self.target.clone();
        let busy_timeout = self.busy_timeout;
        async move {
            let open_target = target.clone();
            let conn =
                tokio::task::spawn_blocking(move || open_connection(&open_target, busy_timeout))
                    .await
                    .map_err(|err| BenchError::connection(target.clone(), err))?
                    .map_err(|err| BenchError::connection(target.clone(), err))?;
            log::trace!("opened session on {target}");
            Ok(SqliteSession {
                conn: Arc::new(Mutex::new(conn)),
            })
        }
    }
}

/// One rusqlite connection. Closed when the session and any request still
/// running on the blocking pool have both let go of it.
pub struct SqliteSession {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSession {
    fn run<T, F>(
        &self,
        context: impl Into<String>,
        work: F,
    ) -> impl Future<Output = Result<T, BenchError>> + Send
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let context: String = context.into();
        async move {
            let blocking_context = context.clone();
            tokio::task::spawn_blocking(move || {
                let guard = conn.lock().map_err(|_| {
                    BenchError::query(blocking_context.clone(), "connection lock poisoned")
                })?;
                work(&*guard).map_err(|err| BenchError::query(blocking_context, err))
            })
            .await
            .map_err(|err| BenchError::query(context, err))?
        }
    }
}

impl Session for SqliteSession {
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<RowSet, BenchError>> + Send {
        let sql = sql.to_string();
        let params = params.clone();
        self.run(statement_context(&sql), move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            bind_params(&mut stmt, &params)?;
            collect_rows(&mut stmt)
        })
    }

    fn query_multiple(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<GridReader, BenchError>> + Send {
        let sql = sql.to_string();
        let params = params.clone();
        let run = self.run(statement_context(&sql), move |conn| {
            let mut batch = Batch::new(conn, &sql);
            let mut sets = Vec::new();
            while let Some(mut stmt) = batch.next()? {
                bind_params(&mut stmt, &params)?;
                sets.push(collect_rows(&mut stmt)?);
            }
            Ok(sets)
        });
        async move { run.await.map(GridReader::new) }
    }

    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<(), BenchError>> + Send {
        let sql = sql.to_string();
        self.run("batch", move |conn| conn.execute_batch(&sql))
    }

    fn execute_bulk(
        &mut self,
        statements: Vec<BulkStatement>,
    ) -> impl Future<Output = Result<usize, BenchError>> + Send {
        self.run("bulk insert", move |conn| {
            let tx = conn.unchecked_transaction()?;
            let mut changed = 0;
            for statement in &statements {
                let mut stmt = tx.prepare(&statement.sql)?;
                for params in &statement.rows {
                    bind_params(&mut stmt, params)?;
                    changed += stmt.raw_execute()?;
                }
            }
            tx.commit()?;
            Ok(changed)
        })
    }
}

/// First line of a statement, for error context.
fn statement_context(sql: &str) -> String {
    let line = sql.trim().lines().next().unwrap_or_default().trim();
    let mut context: String = line.chars().take(60).collect();
    if context.len() < line.len() {
        context.push_str("...");
    }
    context
}

fn bind_params(stmt: &mut Statement<'_>, params: &Params) -> rusqlite::Result<()> {
    for (name, value) in params.iter() {
        for sigil in PARAM_SIGILS {
            if let Some(index) = stmt.parameter_index(&format!("{sigil}{name}"))? {
                stmt.raw_bind_parameter(index, to_sql(value))?;
            }
        }
    }
    Ok(())
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

fn collect_rows(stmt: &mut Statement<'_>) -> rusqlite::Result<RowSet> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let width = columns.len();
    let mut set = RowSet::new(columns);

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(from_sql(row.get_ref(idx)?));
        }
        set.push(values);
    }
    Ok(set)
}
