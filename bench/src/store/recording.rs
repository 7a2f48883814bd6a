//! A store wrapper that records connections and requests.
//!
//! Used by the tests to check each strategy's round-trip shape (how many
//! requests, over how many connections, yielding how many result sets) and
//! that every connection is released. It can also slow every request down, to
//! make overlap between concurrent sessions observable, and fail requests
//! whose SQL contains a given fragment.

use super::{BulkStatement, GridReader, Session, Store};
use order_core::value::{Params, RowSet};
use order_core::BenchError;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Query,
    QueryMultiple,
    Execute,
}

/// One request as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Store-local connection number, starting at 1.
    pub connection: usize,
    pub kind: RequestKind,
    pub sql: String,
    /// Result sets returned; 0 for failed requests.
    pub result_sets: usize,
    pub succeeded: bool,
}

/// Snapshot of everything recorded so far.
#[derive(Debug, Clone, Default)]
pub struct RecordingStats {
    pub connections_opened: usize,
    pub live_connections: usize,
    pub peak_live_connections: usize,
    pub requests: Vec<RecordedRequest>,
}

impl RecordingStats {
    /// Requests excluding schema/seed batches.
    pub fn round_trips(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.kind != RequestKind::Execute)
            .count()
    }

    /// Distinct connections that issued at least one query.
    pub fn connections_used(&self) -> usize {
        self.requests
            .iter()
            .filter(|r| r.kind != RequestKind::Execute)
            .map(|r| r.connection)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn result_sets(&self) -> usize {
        self.requests.iter().map(|r| r.result_sets).sum()
    }
}

#[derive(Debug, Default)]
struct Recorder {
    opened: AtomicUsize,
    live: AtomicUsize,
    peak: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    latency: Option<Duration>,
    fail_on: Option<String>,
}

impl Recorder {
    fn open_connection(&self) -> usize {
        let id = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);
        id
    }

    fn close_connection(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    fn record(&self, connection: usize, kind: RequestKind, sql: &str, result_sets: Option<usize>) {
        let request = RecordedRequest {
            connection,
            kind,
            sql: sql.to_string(),
            result_sets: result_sets.unwrap_or(0),
            succeeded: result_sets.is_some(),
        };
        // A poisoned log only means another test thread panicked mid-push.
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }
    }

    async fn before_request(&self, sql: &str) -> Result<(), BenchError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(BenchError::query(
                "recording store",
                format!("injected failure for statement containing '{fragment}'"),
            )),
            _ => Ok(()),
        }
    }
}

pub struct RecordingStore<S> {
    inner: S,
    recorder: Arc<Recorder>,
}

impl<S: Store> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            recorder: Arc::new(Recorder::default()),
        }
    }

    /// Delay every request by `latency` before it reaches the inner store.
    pub fn with_latency(inner: S, latency: Duration) -> Self {
        Self::build(inner, Some(latency), None)
    }

    /// Fail every request whose SQL contains `fragment`.
    pub fn failing_on(inner: S, fragment: &str) -> Self {
        Self::build(inner, None, Some(fragment.to_string()))
    }

    pub fn build(inner: S, latency: Option<Duration>, fail_on: Option<String>) -> Self {
        Self {
            inner,
            recorder: Arc::new(Recorder {
                latency,
                fail_on,
                ..Recorder::default()
            }),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> RecordingStats {
        let requests = match self.recorder.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        RecordingStats {
            connections_opened: self.recorder.opened.load(Ordering::SeqCst),
            live_connections: self.recorder.live.load(Ordering::SeqCst),
            peak_live_connections: self.recorder.peak.load(Ordering::SeqCst),
            requests,
        }
    }

    /// Forget everything recorded so far. Live connection counts are kept.
    pub fn reset(&self) {
        self.recorder.opened.store(0, Ordering::SeqCst);
        self.recorder
            .peak
            .store(self.recorder.live.load(Ordering::SeqCst), Ordering::SeqCst);
        match self.recorder.requests.lock() {
            Ok(mut requests) => requests.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl<S: Store> Store for RecordingStore<S> {
    type Session = RecordingSession<S::Session>;

    fn target(&self) -> &str {
        self.inner.target()
    }

    fn connect(&self) -> impl Future<Output = Result<Self::Session, BenchError>> + Send {
        let connect = self.inner.connect();
        let recorder = Arc::clone(&self.recorder);
        async move {
            let inner = connect.await?;
            let id = recorder.open_connection();
            Ok(RecordingSession {
                inner,
                id,
                recorder,
            })
        }
    }
}

pub struct RecordingSession<T> {
    inner: T,
    id: usize,
    recorder: Arc<Recorder>,
}

impl<T> RecordingSession<T> {
    pub fn connection_id(&self) -> usize {
        self.id
    }
}

impl<T> Drop for RecordingSession<T> {
    fn drop(&mut self) {
        self.recorder.close_connection();
    }
}

impl<T: Session> Session for RecordingSession<T> {
    fn query(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<RowSet, BenchError>> + Send {
        async move {
            let result = match self.recorder.before_request(sql).await {
                Ok(()) => self.inner.query(sql, params).await,
                Err(err) => Err(err),
            };
            let sets = result.as_ref().ok().map(|_| 1);
            self.recorder.record(self.id, RequestKind::Query, sql, sets);
            result
        }
    }

    fn query_multiple(
        &mut self,
        sql: &str,
        params: &Params,
    ) -> impl Future<Output = Result<GridReader, BenchError>> + Send {
        async move {
            let result = match self.recorder.before_request(sql).await {
                Ok(()) => self.inner.query_multiple(sql, params).await,
                Err(err) => Err(err),
            };
            let sets = result.as_ref().ok().map(GridReader::len);
            self.recorder
                .record(self.id, RequestKind::QueryMultiple, sql, sets);
            result
        }
    }

    fn execute(&mut self, sql: &str) -> impl Future<Output = Result<(), BenchError>> + Send {
        async move {
            let result = self.inner.execute(sql).await;
            let sets = result.as_ref().ok().map(|_| 0);
            self.recorder.record(self.id, RequestKind::Execute, sql, sets);
            result
        }
    }

    fn execute_bulk(
        &mut self,
        statements: Vec<BulkStatement>,
    ) -> impl Future<Output = Result<usize, BenchError>> + Send {
        async move {
            let sql = statements
                .iter()
                .map(|s| s.sql.as_str())
                .collect::<Vec<_>>()
                .join(";\n");
            let result = self.inner.execute_bulk(statements).await;
            let sets = result.as_ref().ok().map(|_| 0);
            self.recorder.record(self.id, RequestKind::Execute, &sql, sets);
            result
        }
    }
}
